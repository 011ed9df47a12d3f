//! Stored documents and the shapes they take on the wire.
//!
//! Documents keep references as `ObjectId`s; response types render them as hex
//! strings, resolving referenced users where an endpoint needs more than the
//! id.

pub mod board;
pub mod task;
pub mod user;

pub use board::{Board, BoardDetail, BoardListItem, BoardView, ResolvedBoard};
pub use task::{Task, TaskDetail, TaskPatch, TaskPriority, TaskStatus, TaskView};
pub use user::{
    EmailMatch, PendingRequest, PublicUser, RequestStatus, Role, User, UserProfile, UserSummary,
};
