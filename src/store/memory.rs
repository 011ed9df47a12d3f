use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use super::{Store, StoreError, StoreResult, UnitOfWork, Write};
use crate::models::{Board, Task, User};

#[derive(Debug, Clone, Default)]
struct Collections {
    users: Vec<User>,
    boards: Vec<Board>,
    tasks: Vec<Task>,
}

/// In-process store. A commit applies its writes to a copy of the
/// collections and swaps the copy in only if every write succeeded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Collections>,
    fail_at: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── TEST SUPPORT ────────────────────────────────────────────────────────
    // Used by the crate's tests to inspect state and to simulate a database
    // failure mid-commit. Not part of the `Store` contract; the server never
    // calls them.

    /// Make the next commit fail with [`StoreError::Aborted`] after `applied`
    /// of its writes went through. Test support only.
    #[doc(hidden)]
    pub fn fail_next_commit_after(&self, applied: usize) {
        if let Ok(mut fail_at) = self.fail_at.lock() {
            *fail_at = Some(applied);
        }
    }

    /// Snapshot of every board. Test support only.
    #[doc(hidden)]
    pub fn all_boards(&self) -> Vec<Board> {
        self.lock().map(|d| d.boards.clone()).unwrap_or_default()
    }

    /// Snapshot of every task. Test support only.
    #[doc(hidden)]
    pub fn all_tasks(&self) -> Vec<Task> {
        self.lock().map(|d| d.tasks.clone()).unwrap_or_default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.data
            .lock()
            .map_err(|_| StoreError::Aborted("memory store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> StoreResult<T> {
        let data = self.lock()?;
        Ok(f(&data))
    }
}

fn user_not_found() -> StoreError {
    StoreError::NotFound("User not found".to_string())
}

fn board_not_found() -> StoreError {
    StoreError::NotFound("Board not found".to_string())
}

fn task_not_found() -> StoreError {
    StoreError::NotFound("Task not found".to_string())
}

impl Collections {
    fn user_mut(&mut self, id: &ObjectId) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == *id)
            .ok_or_else(user_not_found)
    }

    fn apply(&mut self, write: Write) -> StoreResult<()> {
        match write {
            Write::InsertUser(user) => {
                if self.users.iter().any(|u| u.email == user.email) {
                    return Err(StoreError::Duplicate("User already exists".to_string()));
                }
                self.users.push(user);
            }
            Write::UpdateProfile {
                user,
                name,
                profile_image,
            } => {
                let user = self.user_mut(&user)?;
                if let Some(name) = name {
                    user.name = name;
                }
                if let Some(image) = profile_image {
                    user.profile_image = image;
                }
                user.updated_at = Utc::now();
            }
            Write::DeleteUser(id) => {
                let before = self.users.len();
                self.users.retain(|u| u.id != id);
                if self.users.len() == before {
                    return Err(user_not_found());
                }
            }
            Write::AddContact { user, contact } => {
                let user = self.user_mut(&user)?;
                if !user.contacts.contains(&contact) {
                    user.contacts.push(contact);
                }
            }
            Write::PushRequest { recipient, request } => {
                let recipient = self.user_mut(&recipient)?;
                if recipient.has_contact(&request.user) {
                    return Err(StoreError::Conflict("Users are already contacts".to_string()));
                }
                if recipient.has_pending_from(&request.user) {
                    return Err(StoreError::Conflict("Request already pending".to_string()));
                }
                recipient.pending_requests.push(request);
            }
            Write::PullRequest { user, request } => {
                let user = self.user_mut(&user)?;
                let position = user
                    .pending_requests
                    .iter()
                    .position(|r| r.id == request)
                    .ok_or_else(|| StoreError::NotFound("Request not found".to_string()))?;
                user.pending_requests.remove(position);
            }
            Write::PullContactEverywhere(id) => {
                for user in &mut self.users {
                    user.contacts.retain(|c| *c != id);
                }
            }
            Write::PullRequestsFrom(id) => {
                for user in &mut self.users {
                    user.pending_requests.retain(|r| r.user != id);
                }
            }
            Write::InsertBoard(board) => self.boards.push(board),
            Write::UpdateBoard {
                id,
                title,
                description,
                members,
            } => {
                if let Some(missing) = members
                    .iter()
                    .flatten()
                    .find(|m| !self.users.iter().any(|u| u.id == **m))
                {
                    return Err(StoreError::NotFound(format!("User {} not found", missing.to_hex())));
                }
                let board = self
                    .boards
                    .iter_mut()
                    .find(|b| b.id == id)
                    .ok_or_else(board_not_found)?;
                if let Some(title) = title {
                    board.title = title;
                }
                if let Some(description) = description {
                    board.description = description;
                }
                if let Some(members) = members {
                    board.members = members;
                }
                board.updated_at = Utc::now();
            }
            Write::DeleteBoard(id) => {
                let before = self.boards.len();
                self.boards.retain(|b| b.id != id);
                if self.boards.len() == before {
                    return Err(board_not_found());
                }
            }
            Write::DeleteBoardsOwnedBy(owner) => {
                let owned: Vec<ObjectId> = self
                    .boards
                    .iter()
                    .filter(|b| b.owner == owner)
                    .map(|b| b.id)
                    .collect();
                self.tasks.retain(|t| !owned.contains(&t.board));
                self.boards.retain(|b| b.owner != owner);
            }
            Write::PullMemberEverywhere(id) => {
                for board in &mut self.boards {
                    board.members.retain(|m| *m != id);
                }
            }
            Write::InsertTask(task) => {
                if !self.boards.iter().any(|b| b.id == task.board) {
                    return Err(board_not_found());
                }
                self.tasks.push(task);
            }
            Write::ReplaceTask(task) => {
                let slot = self
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == task.id)
                    .ok_or_else(task_not_found)?;
                *slot = task;
            }
            Write::DeleteTask(id) => {
                let before = self.tasks.len();
                self.tasks.retain(|t| t.id != id);
                if self.tasks.len() == before {
                    return Err(task_not_found());
                }
            }
            Write::DeleteTasksOnBoard(board) => self.tasks.retain(|t| t.board != board),
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user(&self, id: ObjectId) -> StoreResult<Option<User>> {
        self.read(|d| d.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.read(|d| d.users.iter().find(|u| u.email == email).cloned())
    }

    async fn users(&self, ids: &[ObjectId]) -> StoreResult<Vec<User>> {
        self.read(|d| {
            d.users
                .iter()
                .filter(|u| ids.contains(&u.id))
                .cloned()
                .collect()
        })
    }

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        self.read(|d| {
            d.users
                .iter()
                .filter(|u| emails.contains(&u.email))
                .cloned()
                .collect()
        })
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        self.read(|d| d.users.clone())
    }

    async fn board(&self, id: ObjectId) -> StoreResult<Option<Board>> {
        self.read(|d| d.boards.iter().find(|b| b.id == id).cloned())
    }

    async fn boards_with_member(&self, user: ObjectId) -> StoreResult<Vec<Board>> {
        self.read(|d| {
            d.boards
                .iter()
                .filter(|b| b.is_member(&user))
                .cloned()
                .collect()
        })
    }

    async fn task(&self, id: ObjectId) -> StoreResult<Option<Task>> {
        self.read(|d| d.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn tasks_on_board(&self, board: ObjectId) -> StoreResult<Vec<Task>> {
        self.read(|d| d.tasks.iter().filter(|t| t.board == board).cloned().collect())
    }

    async fn count_tasks_on_board(&self, board: ObjectId) -> StoreResult<u64> {
        self.read(|d| d.tasks.iter().filter(|t| t.board == board).count() as u64)
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        let fail_at = self
            .fail_at
            .lock()
            .map_err(|_| StoreError::Aborted("memory store lock poisoned".to_string()))?
            .take();

        let mut data = self.lock()?;
        let mut scratch = data.clone();
        for (index, write) in unit.into_writes().into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(StoreError::Aborted(format!("injected failure before write {index}")));
            }
            scratch.apply(write)?;
        }
        *data = scratch;
        Ok(())
    }
}
