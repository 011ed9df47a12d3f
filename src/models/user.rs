use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Account role. Admins can list and delete other users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Lifecycle of a contact invitation. Accepted and rejected are terminal;
/// the request is removed from the recipient once it reaches either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// A contact invitation, stored on the recipient. `user` is the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    #[serde(default)]
    pub status: RequestStatus,
}

impl PendingRequest {
    pub fn new(sender: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            user: sender,
            status: RequestStatus::Pending,
        }
    }

    pub fn is_pending_from(&self, sender: &ObjectId) -> bool {
        self.user == *sender && self.status == RequestStatus::Pending
    }
}

/// The `users` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    /// bcrypt hash, never the plaintext.
    pub password: String,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub contacts: Vec<ObjectId>,
    #[serde(default)]
    pub pending_requests: Vec<PendingRequest>,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name,
            email,
            password: password_hash,
            profile_image: String::new(),
            contacts: Vec::new(),
            pending_requests: Vec::new(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_contact(&self, other: &ObjectId) -> bool {
        self.contacts.contains(other)
    }

    pub fn has_pending_from(&self, sender: &ObjectId) -> bool {
        self.pending_requests.iter().any(|r| r.is_pending_from(sender))
    }

    pub fn find_request(&self, request_id: &ObjectId) -> Option<&PendingRequest> {
        self.pending_requests.iter().find(|r| r.id == *request_id)
    }
}

// ─── RESPONSE SHAPES ──────────────────────────────────────────────────────────

/// A resolved user reference: what a board member, contact or task author
/// looks like on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_image: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

/// Resolve `ids` against `users`, keeping the order of `ids` and skipping
/// references that no longer resolve.
pub fn summaries_in_order(ids: &[ObjectId], users: &[User]) -> Vec<UserSummary> {
    ids.iter()
        .filter_map(|id| users.iter().find(|u| u.id == *id))
        .map(UserSummary::from)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub status: RequestStatus,
}

/// A user without the password hash, references left as ids.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_image: String,
    pub contacts: Vec<String>,
    pub pending_requests: Vec<RequestView>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
            contacts: user.contacts.iter().map(|id| id.to_hex()).collect(),
            pending_requests: user
                .pending_requests
                .iter()
                .map(|r| RequestView {
                    id: r.id.to_hex(),
                    user: r.user.to_hex(),
                    status: r.status,
                })
                .collect(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequest {
    #[serde(rename = "_id")]
    pub id: String,
    /// `None` when the sender no longer exists.
    pub user: Option<UserSummary>,
    pub status: RequestStatus,
}

/// The profile page: contacts and request senders resolved at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_image: String,
    pub contacts: Vec<UserSummary>,
    pub pending_requests: Vec<ResolvedRequest>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// `related` must hold every contact and request sender that still exists.
    pub fn resolve(user: &User, related: &[User]) -> Self {
        let find = |id: &ObjectId| related.iter().find(|u| u.id == *id).map(UserSummary::from);
        Self {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
            contacts: summaries_in_order(&user.contacts, related),
            pending_requests: user
                .pending_requests
                .iter()
                .map(|r| ResolvedRequest {
                    id: r.id.to_hex(),
                    user: find(&r.user),
                    status: r.status,
                })
                .collect(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// One hit of an email lookup.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMatch {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
}

impl From<&User> for EmailMatch {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            email: user.email.clone(),
        }
    }
}
