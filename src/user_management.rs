// src/user_management.rs

use actix_web::{web, HttpResponse};
use log::{debug, error, info};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{store_failure, ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::user::summaries_in_order;
use crate::models::{EmailMatch, PendingRequest, PublicUser, User, UserProfile, UserSummary};
use crate::store::{Store, UnitOfWork, Write};
use crate::validation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// URL of an already hosted image.
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FindByEmailRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub request_id: String,
}

async fn load_user(store: &dyn Store, id: ObjectId, context: &'static str) -> ApiResult<User> {
    store
        .user(id)
        .await
        .map_err(store_failure(context))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

// ─── PROFILE ─────────────────────────────────────────────────────────────────

/// GET /api/user/profile
pub async fn get_profile(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let context = "Error fetching profile";
    let user = load_user(data.store.as_ref(), current.id, context).await?;

    let mut related: Vec<ObjectId> = user.contacts.clone();
    related.extend(user.pending_requests.iter().map(|r| r.user));
    let related = data
        .store
        .users(&related)
        .await
        .map_err(store_failure(context))?;

    Ok(HttpResponse::Ok().json(UserProfile::resolve(&user, &related)))
}

/// PUT /api/user/update
pub async fn update_profile(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    payload: web::Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let name = payload.name.as_deref().map(validation::name).transpose()?;
    let profile_image = payload
        .profile_image
        .as_deref()
        .map(validation::profile_image)
        .transpose()?;

    let context = "Error updating profile";
    if name.is_some() || profile_image.is_some() {
        data.store
            .commit(
                Write::UpdateProfile {
                    user: current.id,
                    name,
                    profile_image,
                }
                .into(),
            )
            .await
            .map_err(store_failure(context))?;
        info!("User {} updated their profile", current.id);
    }

    let user = load_user(data.store.as_ref(), current.id, context).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": UserSummary::from(&user),
    })))
}

/// POST /api/user/find-by-email
/// Resolve a list of addresses to user ids. Any unknown address fails the
/// whole lookup with the missing ones listed under `notFound`.
pub async fn find_users_by_email(
    data: web::Data<AppState>,
    payload: web::Json<FindByEmailRequest>,
) -> ApiResult<HttpResponse> {
    let emails: Vec<String> = payload
        .into_inner()
        .emails
        .into_iter()
        .map(|e| e.trim().to_string())
        .collect();

    let users = data.store.users_by_email(&emails).await.map_err(|e| {
        error!("Error looking up users by email: {}", e);
        ApiError::Internal("Error looking up users".to_string())
    })?;

    let not_found: Vec<String> = emails
        .iter()
        .filter(|email| !users.iter().any(|u| u.email == **email))
        .cloned()
        .collect();
    if !not_found.is_empty() {
        debug!("{} of {} emails are not registered", not_found.len(), emails.len());
        return Err(ApiError::UnknownEmails(not_found));
    }

    let matches: Vec<EmailMatch> = users.iter().map(EmailMatch::from).collect();
    Ok(HttpResponse::Ok().json(matches))
}

// ─── CONTACT REQUESTS ────────────────────────────────────────────────────────

/// POST /api/user/send-friend-request
pub async fn send_friend_request(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    payload: web::Json<FriendRequest>,
) -> ApiResult<HttpResponse> {
    let email = payload.into_inner().email.trim().to_string();
    if email == current.email {
        return Err(ApiError::BadRequest(
            "You cannot send a request to yourself".to_string(),
        ));
    }

    let context = "Error sending request";
    let recipient = data
        .store
        .user_by_email(&email)
        .await
        .map_err(store_failure(context))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let sender = load_user(data.store.as_ref(), current.id, context).await?;

    if recipient.has_contact(&sender.id) || sender.has_contact(&recipient.id) {
        return Err(ApiError::BadRequest("You are already contacts".to_string()));
    }
    if recipient.has_pending_from(&sender.id) || sender.has_pending_from(&recipient.id) {
        return Err(ApiError::BadRequest("Request already pending".to_string()));
    }

    // The write re-checks both conditions so a racing duplicate is refused too.
    data.store
        .commit(
            Write::PushRequest {
                recipient: recipient.id,
                request: PendingRequest::new(sender.id),
            }
            .into(),
        )
        .await
        .map_err(store_failure(context))?;

    info!("User {} sent a contact request to {}", sender.id, recipient.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Friend request sent" })))
}

/// POST /api/user/accept-friend-request
/// Both users gain each other as contacts and the request is removed, in one
/// unit of work.
pub async fn accept_friend_request(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    payload: web::Json<RespondRequest>,
) -> ApiResult<HttpResponse> {
    let request_id = validation::object_id(&payload.request_id, "request")?;
    let context = "Error accepting request";

    let user = load_user(data.store.as_ref(), current.id, context).await?;
    let request = user
        .find_request(&request_id)
        .ok_or_else(|| ApiError::NotFound("Request not found".to_string()))?;
    let sender = load_user(data.store.as_ref(), request.user, context).await?;

    let unit = UnitOfWork::new()
        .with(Write::AddContact {
            user: user.id,
            contact: sender.id,
        })
        .with(Write::AddContact {
            user: sender.id,
            contact: user.id,
        })
        .with(Write::PullRequest {
            user: user.id,
            request: request_id,
        });
    data.store
        .commit(unit)
        .await
        .map_err(store_failure(context))?;

    info!("User {} accepted the request from {}", user.id, sender.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Request accepted",
        "newContact": {
            "_id": sender.id.to_hex(),
            "name": sender.name,
            "email": sender.email,
        },
    })))
}

/// POST /api/user/reject-friend-request
pub async fn reject_friend_request(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    payload: web::Json<RespondRequest>,
) -> ApiResult<HttpResponse> {
    let request_id = validation::object_id(&payload.request_id, "request")?;

    data.store
        .commit(
            Write::PullRequest {
                user: current.id,
                request: request_id,
            }
            .into(),
        )
        .await
        .map_err(|err| match store_failure("Error rejecting request")(err) {
            ApiError::NotFound(_) => ApiError::NotFound("Request not found".to_string()),
            other => other,
        })?;

    info!("User {} rejected request {}", current.id, request_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Request rejected and removed"
    })))
}

/// GET /api/user/contacts
pub async fn get_contacts(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let context = "Error fetching contacts";
    let user = load_user(data.store.as_ref(), current.id, context).await?;
    let contacts = data
        .store
        .users(&user.contacts)
        .await
        .map_err(store_failure(context))?;
    Ok(HttpResponse::Ok().json(summaries_in_order(&user.contacts, &contacts)))
}

// ─── ADMIN ───────────────────────────────────────────────────────────────────

/// GET /api/user/admin
pub async fn list_users(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    current.require_admin()?;
    let users = data
        .store
        .all_users()
        .await
        .map_err(store_failure("Error fetching users"))?;
    let users: Vec<PublicUser> = users.iter().map(PublicUser::from).collect();
    Ok(HttpResponse::Ok().json(users))
}

/// DELETE /api/user/admin/{user_id}
/// Removes the user together with every board they own (and those boards'
/// tasks), and strips them from memberships, contacts and pending requests.
pub async fn delete_user(
    data: web::Data<AppState>,
    current: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    current.require_admin()?;
    let context = "Error deleting user";
    let user_id = validation::object_id(&path.into_inner(), "user")?;
    let user = load_user(data.store.as_ref(), user_id, context).await?;

    let unit = UnitOfWork::new()
        .with(Write::DeleteBoardsOwnedBy(user.id))
        .with(Write::PullMemberEverywhere(user.id))
        .with(Write::PullContactEverywhere(user.id))
        .with(Write::PullRequestsFrom(user.id))
        .with(Write::DeleteUser(user.id));
    data.store
        .commit(unit)
        .await
        .map_err(store_failure(context))?;

    info!("Admin {} deleted user {}", current.id, user.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User, boards and tasks deleted successfully"
    })))
}
