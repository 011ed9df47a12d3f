// src/routes.rs

use actix_web::web;

use crate::auth::{login, register, verify_session};
use crate::board::{create_board, delete_board, get_board, list_boards, update_board};
use crate::error::{json_error_handler, route_not_found};
use crate::middleware::Authentication;
use crate::task::{create_task, delete_task, get_task, list_tasks_by_board, update_task};
use crate::user_management::{
    accept_friend_request, delete_user, find_users_by_email, get_contacts, get_profile,
    list_users, reject_friend_request, send_friend_request, update_profile,
};

/// Largest JSON body accepted.
pub const JSON_LIMIT: usize = 10 * 1024 * 1024;

/// Mount the whole API. Shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(json_error_handler),
    )
    // AUTH
    .service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .service(
                web::resource("/verify")
                    .wrap(Authentication)
                    .route(web::get().to(verify_session)),
            ),
    )
    // USERS
    .service(
        web::scope("/api/user")
            .wrap(Authentication)
            .route("/profile", web::get().to(get_profile))
            .route("/update", web::put().to(update_profile))
            .route("/find-by-email", web::post().to(find_users_by_email))
            .route("/send-friend-request", web::post().to(send_friend_request))
            .route("/accept-friend-request", web::post().to(accept_friend_request))
            .route("/reject-friend-request", web::post().to(reject_friend_request))
            .route("/contacts", web::get().to(get_contacts))
            .route("/admin", web::get().to(list_users))
            .route("/admin/{user_id}", web::delete().to(delete_user)),
    )
    // BOARDS
    .service(
        web::scope("/api/board")
            .wrap(Authentication)
            .route("/create", web::post().to(create_board))
            .route("", web::get().to(list_boards))
            .route("/", web::get().to(list_boards))
            .route("/{id}", web::get().to(get_board))
            .route("/{id}", web::put().to(update_board))
            .route("/{id}", web::delete().to(delete_board)),
    )
    // TASKS
    .service(
        web::scope("/api/task")
            .wrap(Authentication)
            .route("/create", web::post().to(create_task))
            .route("/board/{board_id}", web::get().to(list_tasks_by_board))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task)),
    )
    .default_service(web::to(route_not_found));
}
