//! Persistence behind a trait so handlers do not care which database backs
//! them.
//!
//! Reads go straight to the store. Every mutation is expressed as a
//! [`UnitOfWork`]: an ordered list of [`Write`]s that [`Store::commit`] applies
//! all together or not at all. Cascades (board deletion, user deletion,
//! accepting a contact request) are just units of work with several writes.

mod memory;
mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use mongodb::bson::oid::ObjectId;

use crate::config::{Config, StorageBackend};
use crate::models::{Board, PendingRequest, Task, User};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (the user email) is already taken.
    #[error("{0}")]
    Duplicate(String),

    /// A write targeted a document that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A guarded write found its precondition violated.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("unit of work aborted: {0}")]
    Aborted(String),
}

/// One document mutation inside a unit of work.
#[derive(Debug, Clone)]
pub enum Write {
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    InsertUser(User),
    UpdateProfile {
        user: ObjectId,
        name: Option<String>,
        profile_image: Option<String>,
    },
    DeleteUser(ObjectId),
    /// Adds `contact` to `user`'s contacts unless already present.
    AddContact { user: ObjectId, contact: ObjectId },
    /// Queues a request on `recipient`. Fails with [`StoreError::Conflict`]
    /// when the sender already has a pending request there or the two are
    /// already contacts.
    PushRequest {
        recipient: ObjectId,
        request: PendingRequest,
    },
    /// Removes one request from `user`. Fails when it is already gone.
    PullRequest { user: ObjectId, request: ObjectId },
    PullContactEverywhere(ObjectId),
    PullRequestsFrom(ObjectId),

    InsertBoard(Board),
    /// Sets only the provided fields. `members` is stored as given, so it must
    /// already contain the owner; fails with [`StoreError::NotFound`] when any
    /// of them is no longer a user.
    UpdateBoard {
        id: ObjectId,
        title: Option<String>,
        description: Option<String>,
        members: Option<Vec<ObjectId>>,
    },
    DeleteBoard(ObjectId),
    /// Deletes every board owned by the user along with their tasks.
    DeleteBoardsOwnedBy(ObjectId),
    PullMemberEverywhere(ObjectId),

    /// Fails with [`StoreError::NotFound`] when the board is gone.
    InsertTask(Task),
    ReplaceTask(Task),
    DeleteTask(ObjectId),
    DeleteTasksOnBoard(ObjectId),
}

impl Write {
    /// Short name for logs; the payload may hold a password hash.
    pub fn kind(&self) -> &'static str {
        match self {
            Write::InsertUser(_) => "insert user",
            Write::UpdateProfile { .. } => "update profile",
            Write::DeleteUser(_) => "delete user",
            Write::AddContact { .. } => "add contact",
            Write::PushRequest { .. } => "push request",
            Write::PullRequest { .. } => "pull request",
            Write::PullContactEverywhere(_) => "pull contact everywhere",
            Write::PullRequestsFrom(_) => "pull requests from user",
            Write::InsertBoard(_) => "insert board",
            Write::UpdateBoard { .. } => "update board",
            Write::DeleteBoard(_) => "delete board",
            Write::DeleteBoardsOwnedBy(_) => "delete boards owned by user",
            Write::PullMemberEverywhere(_) => "pull member everywhere",
            Write::InsertTask(_) => "insert task",
            Write::ReplaceTask(_) => "replace task",
            Write::DeleteTask(_) => "delete task",
            Write::DeleteTasksOnBoard(_) => "delete tasks on board",
        }
    }
}

/// Writes that commit or abort as one group.
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    writes: Vec<Write>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

impl From<Write> for UnitOfWork {
    fn from(write: Write) -> Self {
        UnitOfWork::new().with(write)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn user(&self, id: ObjectId) -> StoreResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Users among `ids`, in no particular order. Ids that do not resolve are
    /// skipped.
    async fn users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>>;

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>>;

    async fn all_users(&self) -> StoreResult<Vec<User>>;

    async fn board(&self, id: ObjectId) -> StoreResult<Option<Board>>;

    async fn boards_with_member(&self, user: ObjectId) -> StoreResult<Vec<Board>>;

    async fn task(&self, id: ObjectId) -> StoreResult<Option<Task>>;

    async fn tasks_on_board(&self, board: ObjectId) -> StoreResult<Vec<Task>>;

    async fn count_tasks_on_board(&self, board: ObjectId) -> StoreResult<u64>;

    /// Apply every write in `unit`, or none of them.
    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()>;
}

/// Open the store selected by the configuration.
pub async fn open(config: &Config) -> StoreResult<Arc<dyn Store>> {
    match config.storage {
        StorageBackend::MongoDb => {
            let uri = config
                .mongo_uri
                .as_deref()
                .ok_or_else(|| StoreError::Aborted("MONGO_URI is not configured".to_string()))?;
            let store = MongoStore::connect(uri, &config.database_name).await?;
            info!("Connected to MongoDB database {}", config.database_name);
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            info!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
