use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::task::TaskView;
use super::user::UserSummary;

/// The `boards` document. `owner` never changes after creation and is always
/// part of `members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub owner: ObjectId,
    pub members: Vec<ObjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    pub fn new(title: String, description: String, owner: ObjectId, requested: Vec<ObjectId>) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            title,
            description,
            owner,
            members: member_set(requested, owner),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owner(&self, user: &ObjectId) -> bool {
        self.owner == *user
    }

    pub fn is_member(&self, user: &ObjectId) -> bool {
        self.members.contains(user)
    }
}

/// De-duplicated union of `requested` and `owner`, first occurrence wins.
pub fn member_set(requested: Vec<ObjectId>, owner: ObjectId) -> Vec<ObjectId> {
    let mut members: Vec<ObjectId> = Vec::with_capacity(requested.len() + 1);
    for id in requested.into_iter().chain(std::iter::once(owner)) {
        if !members.contains(&id) {
            members.push(id);
        }
    }
    members
}

// ─── RESPONSE SHAPES ──────────────────────────────────────────────────────────

/// A board as stored, ids rendered as hex strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner: String,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Board> for BoardView {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.to_hex(),
            title: board.title.clone(),
            description: board.description.clone(),
            owner: board.owner.to_hex(),
            members: board.members.iter().map(|id| id.to_hex()).collect(),
            created_at: board.created_at,
            updated_at: board.updated_at,
        }
    }
}

/// An entry of the caller's board list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardListItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner: Option<UserSummary>,
    pub members: Vec<String>,
    pub task_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A board with owner and members resolved. The owner is not repeated in
/// `members`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBoard {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardDetail {
    pub board: ResolvedBoard,
    pub tasks: Vec<TaskView>,
}
