use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use log::{debug, warn};
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};

use super::{Store, StoreError, StoreResult, UnitOfWork, Write};
use crate::models::{Board, Task, User};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Units of work run inside a multi-document
/// transaction, which needs a replica set or sharded cluster.
pub struct MongoStore {
    client: Client,
    db: Database,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn not_found(what: &str) -> StoreError {
    StoreError::NotFound(format!("{what} not found"))
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        let store = MongoStore { client, db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn users_collection(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn boards_collection(&self) -> Collection<Board> {
        self.db.collection("boards")
    }

    fn tasks_collection(&self) -> Collection<Task> {
        self.db.collection("tasks")
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users_collection()
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique).build())
            .await?;
        self.boards_collection()
            .create_index(IndexModel::builder().keys(doc! { "members": 1 }).build())
            .await?;
        self.tasks_collection()
            .create_index(IndexModel::builder().keys(doc! { "board": 1 }).build())
            .await?;
        Ok(())
    }

    /// Fails unless every id in `ids` is a user, as seen by the transaction.
    /// Touches each user's `updatedAt`; MongoDB skips no-op updates, and only
    /// a real write makes a concurrent delete of that user conflict with us.
    async fn ensure_users_exist(
        &self,
        session: &mut ClientSession,
        ids: &[ObjectId],
    ) -> StoreResult<()> {
        let now = to_bson(&Utc::now())?;
        for id in ids {
            let res = self
                .users_collection()
                .update_one(doc! { "_id": *id }, doc! { "$set": { "updatedAt": now.clone() } })
                .session(&mut *session)
                .await?;
            if res.matched_count == 0 {
                return Err(StoreError::NotFound(format!("User {} not found", id.to_hex())));
            }
        }
        Ok(())
    }

    async fn apply(&self, session: &mut ClientSession, write: Write) -> StoreResult<()> {
        debug!("Applying {}", write.kind());
        match write {
            Write::InsertUser(user) => {
                self.users_collection()
                    .insert_one(&user)
                    .session(&mut *session)
                    .await
                    .map_err(|e| {
                        if is_duplicate_key(&e) {
                            StoreError::Duplicate("User already exists".to_string())
                        } else {
                            StoreError::Database(e)
                        }
                    })?;
            }
            Write::UpdateProfile {
                user,
                name,
                profile_image,
            } => {
                let mut set = doc! { "updatedAt": to_bson(&Utc::now())? };
                if let Some(name) = name {
                    set.insert("name", name);
                }
                if let Some(image) = profile_image {
                    set.insert("profileImage", image);
                }
                let res = self
                    .users_collection()
                    .update_one(doc! { "_id": user }, doc! { "$set": set })
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(not_found("User"));
                }
            }
            Write::DeleteUser(id) => {
                let res = self
                    .users_collection()
                    .delete_one(doc! { "_id": id })
                    .session(&mut *session)
                    .await?;
                if res.deleted_count == 0 {
                    return Err(not_found("User"));
                }
            }
            Write::AddContact { user, contact } => {
                let res = self
                    .users_collection()
                    .update_one(doc! { "_id": user }, doc! { "$addToSet": { "contacts": contact } })
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(not_found("User"));
                }
            }
            Write::PushRequest { recipient, request } => {
                let sender = request.user;
                let filter = doc! {
                    "_id": recipient,
                    "contacts": { "$ne": sender },
                    "pendingRequests": {
                        "$not": { "$elemMatch": { "user": sender, "status": "pending" } }
                    },
                };
                let res = self
                    .users_collection()
                    .update_one(filter, doc! { "$push": { "pendingRequests": to_bson(&request)? } })
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(StoreError::Conflict(
                        "Request already pending or users are already contacts".to_string(),
                    ));
                }
            }
            Write::PullRequest { user, request } => {
                let res = self
                    .users_collection()
                    .update_one(
                        doc! { "_id": user, "pendingRequests._id": request },
                        doc! { "$pull": { "pendingRequests": { "_id": request } } },
                    )
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(not_found("Request"));
                }
            }
            Write::PullContactEverywhere(id) => {
                self.users_collection()
                    .update_many(doc! { "contacts": id }, doc! { "$pull": { "contacts": id } })
                    .session(&mut *session)
                    .await?;
            }
            Write::PullRequestsFrom(id) => {
                self.users_collection()
                    .update_many(
                        doc! { "pendingRequests.user": id },
                        doc! { "$pull": { "pendingRequests": { "user": id } } },
                    )
                    .session(&mut *session)
                    .await?;
            }
            Write::InsertBoard(board) => {
                self.boards_collection()
                    .insert_one(&board)
                    .session(&mut *session)
                    .await?;
            }
            Write::UpdateBoard {
                id,
                title,
                description,
                members,
            } => {
                let mut set = doc! { "updatedAt": to_bson(&Utc::now())? };
                if let Some(title) = title {
                    set.insert("title", title);
                }
                if let Some(description) = description {
                    set.insert("description", description);
                }
                if let Some(members) = members {
                    self.ensure_users_exist(session, &members).await?;
                    set.insert("members", members);
                }
                let res = self
                    .boards_collection()
                    .update_one(doc! { "_id": id }, doc! { "$set": set })
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(not_found("Board"));
                }
            }
            Write::DeleteBoard(id) => {
                let res = self
                    .boards_collection()
                    .delete_one(doc! { "_id": id })
                    .session(&mut *session)
                    .await?;
                if res.deleted_count == 0 {
                    return Err(not_found("Board"));
                }
            }
            Write::DeleteBoardsOwnedBy(owner) => {
                let owned: Vec<Bson> = self
                    .boards_collection()
                    .distinct("_id", doc! { "owner": owner })
                    .session(&mut *session)
                    .await?;
                if !owned.is_empty() {
                    self.tasks_collection()
                        .delete_many(doc! { "board": { "$in": owned } })
                        .session(&mut *session)
                        .await?;
                }
                self.boards_collection()
                    .delete_many(doc! { "owner": owner })
                    .session(&mut *session)
                    .await?;
            }
            Write::PullMemberEverywhere(id) => {
                self.boards_collection()
                    .update_many(doc! { "members": id }, doc! { "$pull": { "members": id } })
                    .session(&mut *session)
                    .await?;
            }
            Write::InsertTask(task) => {
                // A write, not a read: a concurrent board delete then conflicts
                // with this transaction instead of leaving an orphan task.
                let res = self
                    .boards_collection()
                    .update_one(
                        doc! { "_id": task.board },
                        doc! { "$set": { "updatedAt": to_bson(&Utc::now())? } },
                    )
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(not_found("Board"));
                }
                self.tasks_collection()
                    .insert_one(&task)
                    .session(&mut *session)
                    .await?;
            }
            Write::ReplaceTask(task) => {
                let res = self
                    .tasks_collection()
                    .replace_one(doc! { "_id": task.id }, &task)
                    .session(&mut *session)
                    .await?;
                if res.matched_count == 0 {
                    return Err(not_found("Task"));
                }
            }
            Write::DeleteTask(id) => {
                let res = self
                    .tasks_collection()
                    .delete_one(doc! { "_id": id })
                    .session(&mut *session)
                    .await?;
                if res.deleted_count == 0 {
                    return Err(not_found("Task"));
                }
            }
            Write::DeleteTasksOnBoard(board) => {
                self.tasks_collection()
                    .delete_many(doc! { "board": board })
                    .session(&mut *session)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn user(&self, id: ObjectId) -> StoreResult<Option<User>> {
        Ok(self.users_collection().find_one(doc! { "_id": id }).await?)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users_collection().find_one(doc! { "email": email }).await?)
    }

    async fn users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .users_collection()
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        let cursor = self
            .users_collection()
            .find(doc! { "email": { "$in": emails.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        let cursor = self.users_collection().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn board(&self, id: ObjectId) -> StoreResult<Option<Board>> {
        Ok(self.boards_collection().find_one(doc! { "_id": id }).await?)
    }

    async fn boards_with_member(&self, user: ObjectId) -> StoreResult<Vec<Board>> {
        let cursor = self.boards_collection().find(doc! { "members": user }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn task(&self, id: ObjectId) -> StoreResult<Option<Task>> {
        Ok(self.tasks_collection().find_one(doc! { "_id": id }).await?)
    }

    async fn tasks_on_board(&self, board: ObjectId) -> StoreResult<Vec<Task>> {
        let cursor = self.tasks_collection().find(doc! { "board": board }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_tasks_on_board(&self, board: ObjectId) -> StoreResult<u64> {
        Ok(self
            .tasks_collection()
            .count_documents(doc! { "board": board })
            .await?)
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        if unit.is_empty() {
            return Ok(());
        }
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        for write in unit.into_writes() {
            if let Err(err) = self.apply(&mut session, write).await {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort transaction: {}", abort_err);
                }
                return Err(err);
            }
        }
        session.commit_transaction().await?;
        Ok(())
    }
}
