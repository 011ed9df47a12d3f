// src/board.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{store_failure, ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::board::member_set;
use crate::models::user::summaries_in_order;
use crate::models::{
    Board, BoardDetail, BoardListItem, BoardView, ResolvedBoard, TaskView, UserSummary,
};
use crate::store::{Store, UnitOfWork, Write};
use crate::validation;

/// Request payload for creating a board
#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    pub title: String,
    pub description: Option<String>,
    /// Hex ids of the other members. The owner is added automatically.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Request payload for updating a board. Absent fields are left alone.
#[derive(Debug, Deserialize)]
pub struct UpdateBoardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<String>>,
}

/// Parse member ids and make sure each one names an existing user.
async fn resolve_members(store: &dyn Store, raw: &[String]) -> ApiResult<Vec<ObjectId>> {
    let ids = validation::object_ids(raw, "member")?;
    if ids.is_empty() {
        return Ok(ids);
    }
    let found = store
        .users(&ids)
        .await
        .map_err(store_failure("Error checking board members"))?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|u| u.id == **id)) {
        return Err(ApiError::NotFound(format!("User {} not found", missing.to_hex())));
    }
    Ok(ids)
}

async fn load_board(store: &dyn Store, raw_id: &str) -> ApiResult<Board> {
    let id = validation::object_id(raw_id, "board")?;
    store
        .board(id)
        .await
        .map_err(store_failure("Error fetching board"))?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))
}

// ─── HANDLERS ────────────────────────────────────────────────────────────────

/// POST /api/board/create
pub async fn create_board(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    payload: web::Json<CreateBoardRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let title = validation::title(&payload.title)?;
    let description = validation::description(payload.description.as_deref())?;
    let members = resolve_members(data.store.as_ref(), &payload.members).await?;

    let board = Board::new(title, description, current.id, members);
    data.store
        .commit(Write::InsertBoard(board.clone()).into())
        .await
        .map_err(store_failure("Error creating board"))?;

    info!("User {} created board {}", current.id, board.id);
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Board created successfully",
        "board": BoardView::from(&board),
    })))
}

/// GET /api/board
/// Boards the caller belongs to, each with its owner and task count.
pub async fn list_boards(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let context = "Error fetching boards";
    let boards = data
        .store
        .boards_with_member(current.id)
        .await
        .map_err(store_failure(context))?;

    let mut owner_ids: Vec<ObjectId> = boards.iter().map(|b| b.owner).collect();
    owner_ids.sort();
    owner_ids.dedup();
    let owners = data
        .store
        .users(&owner_ids)
        .await
        .map_err(store_failure(context))?;

    let mut items = Vec::with_capacity(boards.len());
    for board in &boards {
        let task_count = data
            .store
            .count_tasks_on_board(board.id)
            .await
            .map_err(store_failure(context))?;
        items.push(BoardListItem {
            id: board.id.to_hex(),
            title: board.title.clone(),
            description: board.description.clone(),
            owner: owners
                .iter()
                .find(|u| u.id == board.owner)
                .map(UserSummary::from),
            members: board.members.iter().map(|id| id.to_hex()).collect(),
            task_count,
            created_at: board.created_at,
            updated_at: board.updated_at,
        });
    }

    debug!("User {} has {} boards", current.id, items.len());
    Ok(HttpResponse::Ok().json(items))
}

/// GET /api/board/{id}
/// The board with owner and members resolved, plus its tasks.
pub async fn get_board(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let board = load_board(data.store.as_ref(), &path.into_inner()).await?;
    if !board.is_member(&current.id) {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let context = "Error fetching board";
    let people = data
        .store
        .users(&board.members)
        .await
        .map_err(store_failure(context))?;
    let tasks = data
        .store
        .tasks_on_board(board.id)
        .await
        .map_err(store_failure(context))?;

    let others: Vec<ObjectId> = board
        .members
        .iter()
        .copied()
        .filter(|id| *id != board.owner)
        .collect();

    let detail = BoardDetail {
        board: ResolvedBoard {
            id: board.id.to_hex(),
            title: board.title.clone(),
            description: board.description.clone(),
            owner: people
                .iter()
                .find(|u| u.id == board.owner)
                .map(UserSummary::from),
            members: summaries_in_order(&others, &people),
            created_at: board.created_at,
            updated_at: board.updated_at,
        },
        tasks: tasks.iter().map(TaskView::from).collect(),
    };
    Ok(HttpResponse::Ok().json(detail))
}

/// PUT /api/board/{id}
/// Owner only. Only the provided fields are written, so a member removed by a
/// concurrent user deletion is not put back.
pub async fn update_board(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
    payload: web::Json<UpdateBoardRequest>,
) -> ApiResult<HttpResponse> {
    let board = load_board(data.store.as_ref(), &path.into_inner()).await?;
    if !board.is_owner(&current.id) {
        return Err(ApiError::Forbidden(
            "Only the owner can edit this board".to_string(),
        ));
    }

    let payload = payload.into_inner();
    let title = payload.title.as_deref().map(validation::title).transpose()?;
    let description = payload
        .description
        .as_deref()
        .map(|d| validation::description(Some(d)))
        .transpose()?;
    let members = match payload.members.as_deref() {
        Some(raw) => {
            let requested = resolve_members(data.store.as_ref(), raw).await?;
            Some(member_set(requested, board.owner))
        }
        None => None,
    };

    let context = "Error updating board";
    data.store
        .commit(
            Write::UpdateBoard {
                id: board.id,
                title,
                description,
                members,
            }
            .into(),
        )
        .await
        .map_err(store_failure(context))?;

    let board = data
        .store
        .board(board.id)
        .await
        .map_err(store_failure(context))?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    info!("User {} updated board {}", current.id, board.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Board updated",
        "board": BoardView::from(&board),
    })))
}

/// DELETE /api/board/{id}
/// Owner only. Tasks on the board go with it.
pub async fn delete_board(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let board = load_board(data.store.as_ref(), &path.into_inner()).await?;
    if !board.is_owner(&current.id) {
        return Err(ApiError::Forbidden(
            "Only the owner can delete this board".to_string(),
        ));
    }

    let unit = UnitOfWork::new()
        .with(Write::DeleteTasksOnBoard(board.id))
        .with(Write::DeleteBoard(board.id));
    data.store
        .commit(unit)
        .await
        .map_err(store_failure("Error deleting board"))?;

    info!("User {} deleted board {} and its tasks", current.id, board.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Board and its tasks deleted successfully"
    })))
}
