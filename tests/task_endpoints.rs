#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use common::{bearer, seed_user, send, test_state};
use taskboard::models::{Board, Role, User};
use taskboard::store::{MemoryStore, Store, Write};

async fn board_for(store: &MemoryStore, owner: &User, members: &[&User]) -> Board {
    let board = Board::new(
        "Sprint 1".into(),
        String::new(),
        owner.id,
        members.iter().map(|u| u.id).collect(),
    );
    store.commit(Write::InsertBoard(board.clone()).into()).await.unwrap();
    board
}

#[actix_web::test]
async fn create_applies_defaults_and_sets_author() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let board = board_for(&store, &ana, &[]).await;
    let app = test_app!(state);

    let (status, body) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "  Fix bug ", "board": board.id.to_hex() }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let task = &body["task"];
    assert_eq!(task["title"], "Fix bug");
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["description"], "");
    assert_eq!(task["author"], ana.id.to_hex());
    assert_eq!(task["dueDate"], serde_json::Value::Null);
}

#[actix_web::test]
async fn create_checks_board_and_membership() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let carl = seed_user(&store, "carl", Role::User).await;
    let board = board_for(&store, &ana, &[]).await;
    let app = test_app!(state);

    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Orphan", "board": ObjectId::new().to_hex() }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&carl))
            .set_json(json!({ "title": "Intruder", "board": board.id.to_hex() }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Bad", "board": board.id.to_hex(), "status": "blocked" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.all_tasks().is_empty());
}

#[actix_web::test]
async fn any_member_can_patch_selected_fields() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let board = board_for(&store, &ana, &[&ben]).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ana))
            .set_json(json!({
                "title": "Fix bug",
                "description": "crash on login",
                "board": board.id.to_hex(),
                "priority": "high",
            }))
            .to_request(),
    )
    .await;
    let uri = format!("/api/task/{}", created["task"]["_id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&ben))
            .set_json(json!({ "status": "in_progress", "dueDate": "2030-01-15T09:00:00Z" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let task = &body["task"];
    assert_eq!(task["status"], "in_progress");
    assert_eq!(task["title"], "Fix bug");
    assert_eq!(task["description"], "crash on login");
    assert_eq!(task["priority"], "high");
    assert!(task["dueDate"].as_str().unwrap().starts_with("2030-01-15T09:00:00"));
}

#[actix_web::test]
async fn get_resolves_author_and_listing_is_members_only() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let carl = seed_user(&store, "carl", Role::User).await;
    let board = board_for(&store, &ana, &[]).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Write docs", "board": board.id.to_hex() }))
            .to_request(),
    )
    .await;
    let uri = format!("/api/task/{}", created["task"]["_id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        TestRequest::get().uri(&uri).insert_header(bearer(&ana)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"]["name"], "ana");
    assert_eq!(body["author"]["email"], "ana@example.com");

    let (status, _) = send(
        &app,
        TestRequest::get().uri(&uri).insert_header(bearer(&carl)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let list_uri = format!("/api/task/board/{}", board.id.to_hex());
    let (status, body) = send(
        &app,
        TestRequest::get().uri(&list_uri).insert_header(bearer(&ana)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        TestRequest::get().uri(&list_uri).insert_header(bearer(&carl)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/api/task/board/{}", ObjectId::new().to_hex()))
            .insert_header(bearer(&ana))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn only_the_author_can_delete() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let board = board_for(&store, &ana, &[&ben]).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ben))
            .set_json(json!({ "title": "Ben's task", "board": board.id.to_hex() }))
            .to_request(),
    )
    .await;
    let uri = format!("/api/task/{}", created["task"]["_id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        TestRequest::delete().uri(&uri).insert_header(bearer(&ana)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.all_tasks().len(), 1);

    let (status, _) = send(
        &app,
        TestRequest::delete().uri(&uri).insert_header(bearer(&ben)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(store.all_tasks().is_empty());

    let (status, _) = send(
        &app,
        TestRequest::delete().uri(&uri).insert_header(bearer(&ben)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
