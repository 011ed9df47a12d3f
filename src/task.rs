// src/task.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::{debug, info};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{store_failure, ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::{
    Board, Task, TaskDetail, TaskPatch, TaskPriority, TaskStatus, TaskView, UserSummary,
};
use crate::store::{Store, Write};
use crate::validation;

/// Request payload for creating a task
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Hex id of the board the task goes on.
    pub board: String,
    pub due_date: Option<DateTime<Utc>>,
}

/// Request payload for updating a task
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTaskRequest {
    fn into_patch(self) -> ApiResult<TaskPatch> {
        Ok(TaskPatch {
            title: self.title.as_deref().map(validation::title).transpose()?,
            description: self
                .description
                .as_deref()
                .map(|d| validation::description(Some(d)))
                .transpose()?,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
        })
    }
}

/// The board behind `board_id`, provided the caller is on it.
async fn member_board(
    store: &dyn Store,
    board_id: ObjectId,
    user: &AuthenticatedUser,
) -> ApiResult<Board> {
    let board = store
        .board(board_id)
        .await
        .map_err(store_failure("Error fetching board"))?
        .ok_or_else(|| ApiError::NotFound("Board does not exist".to_string()))?;
    if !board.is_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You are not a member of this board".to_string(),
        ));
    }
    Ok(board)
}

async fn load_task(store: &dyn Store, raw_id: &str) -> ApiResult<Task> {
    let id = validation::object_id(raw_id, "task")?;
    store
        .task(id)
        .await
        .map_err(store_failure("Error fetching task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Like `member_board`, but a task whose board has vanished counts as gone.
async fn check_task_access(
    store: &dyn Store,
    task: &Task,
    user: &AuthenticatedUser,
) -> ApiResult<()> {
    match member_board(store, task.board, user).await {
        Err(ApiError::NotFound(_)) => Err(ApiError::NotFound("Task not found".to_string())),
        other => other.map(|_| ()),
    }
}

/// POST /api/task/create
pub async fn create_task(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    payload: web::Json<CreateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let board_id = validation::object_id(&payload.board, "board")?;
    let board = member_board(data.store.as_ref(), board_id, &current).await?;

    let mut task = Task::new(validation::title(&payload.title)?, current.id, board.id);
    task.description = validation::description(payload.description.as_deref())?;
    task.status = payload.status.unwrap_or_default();
    task.priority = payload.priority.unwrap_or_default();
    task.due_date = payload.due_date;

    // The board is checked again at commit time in case it was deleted meanwhile.
    data.store
        .commit(Write::InsertTask(task.clone()).into())
        .await
        .map_err(store_failure("Error creating task"))?;

    info!("User {} created task {} on board {}", current.id, task.id, board.id);
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Task created successfully",
        "task": TaskView::from(&task),
    })))
}

/// GET /api/task/board/{board_id}
pub async fn list_tasks_by_board(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let board_id = validation::object_id(&path.into_inner(), "board")?;
    let board = member_board(data.store.as_ref(), board_id, &current).await?;

    let tasks = data
        .store
        .tasks_on_board(board.id)
        .await
        .map_err(store_failure("Error fetching tasks"))?;

    debug!("Board {} has {} tasks", board.id, tasks.len());
    let views: Vec<TaskView> = tasks.iter().map(TaskView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /api/task/{id}
/// The task with its author resolved, or `author: null` if they were deleted.
pub async fn get_task(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let task = load_task(data.store.as_ref(), &path.into_inner()).await?;
    check_task_access(data.store.as_ref(), &task, &current).await?;

    let author = data
        .store
        .user(task.author)
        .await
        .map_err(store_failure("Error fetching task"))?;
    Ok(HttpResponse::Ok().json(TaskDetail::new(
        &task,
        author.as_ref().map(UserSummary::from),
    )))
}

/// PUT /api/task/{id}
/// Any board member may edit; only provided fields change.
pub async fn update_task(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let mut task = load_task(data.store.as_ref(), &path.into_inner()).await?;
    check_task_access(data.store.as_ref(), &task, &current).await?;

    let patch = payload.into_inner().into_patch()?;
    if !patch.is_empty() {
        patch.apply(&mut task);
        data.store
            .commit(Write::ReplaceTask(task.clone()).into())
            .await
            .map_err(store_failure("Error updating task"))?;
        info!("User {} updated task {}", current.id, task.id);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Task updated successfully",
        "task": TaskView::from(&task),
    })))
}

/// DELETE /api/task/{id}
/// Only the author may delete a task.
pub async fn delete_task(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let task = load_task(data.store.as_ref(), &path.into_inner()).await?;
    if task.author != current.id {
        return Err(ApiError::Forbidden(
            "You do not have permission to delete this task".to_string(),
        ));
    }

    data.store
        .commit(Write::DeleteTask(task.id).into())
        .await
        .map_err(store_failure("Error deleting task"))?;

    info!("User {} deleted task {}", current.id, task.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Task deleted successfully"
    })))
}
