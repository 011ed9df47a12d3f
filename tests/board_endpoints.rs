#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use common::{bearer, seed_user, send, test_state};
use taskboard::models::{Role, Task};
use taskboard::store::{Store, Write};

#[actix_web::test]
async fn created_board_always_includes_its_owner() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let app = test_app!(state);

    let (status, body) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 1", "members": [] }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["board"]["members"], json!([ana.id.to_hex()]));
    assert_eq!(body["board"]["owner"], ana.id.to_hex());
    assert_eq!(body["board"]["description"], "");
}

#[actix_web::test]
async fn create_rejects_unknown_members_and_bad_titles() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let app = test_app!(state);

    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 1", "members": [ObjectId::new().to_hex()] }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "x".repeat(41) }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.all_boards().is_empty());
}

#[actix_web::test]
async fn list_shows_member_boards_with_task_counts() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let carl = seed_user(&store, "carl", Role::User).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Shared", "members": [ben.id.to_hex()] }))
            .to_request(),
    )
    .await;
    let board_id = ObjectId::parse_str(created["board"]["_id"].as_str().unwrap()).unwrap();
    store
        .commit(Write::InsertTask(Task::new("One".into(), ben.id, board_id)).into())
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        TestRequest::get().uri("/api/board").insert_header(bearer(&ben)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let boards = body.as_array().unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0]["taskCount"], 1);
    assert_eq!(boards[0]["owner"]["name"], "ana");

    let (_, body) = send(
        &app,
        TestRequest::get().uri("/api/board/").insert_header(bearer(&carl)).to_request(),
    )
    .await;
    assert_eq!(body, json!([]));
}

#[actix_web::test]
async fn get_resolves_people_and_hides_board_from_outsiders() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let carl = seed_user(&store, "carl", Role::User).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Roadmap", "members": [ben.id.to_hex()] }))
            .to_request(),
    )
    .await;
    let uri = format!("/api/board/{}", created["board"]["_id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        TestRequest::get().uri(&uri).insert_header(bearer(&ben)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["board"]["owner"]["email"], "ana@example.com");
    let members = body["board"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["_id"], ben.id.to_hex());
    assert_eq!(body["tasks"], json!([]));

    let (status, _) = send(
        &app,
        TestRequest::get().uri(&uri).insert_header(bearer(&carl)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let missing = format!("/api/board/{}", ObjectId::new().to_hex());
    let (status, _) = send(
        &app,
        TestRequest::get().uri(&missing).insert_header(bearer(&ana)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        TestRequest::get().uri("/api/board/not-an-id").insert_header(bearer(&ana)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn non_owner_update_is_forbidden_and_changes_nothing() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 1", "members": [ben.id.to_hex()] }))
            .to_request(),
    )
    .await;
    let uri = format!("/api/board/{}", created["board"]["_id"].as_str().unwrap());
    let before = store.all_boards();

    let (status, _) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&ben))
            .set_json(json!({ "title": "Hijacked", "members": [] }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.all_boards(), before);
}

#[actix_web::test]
async fn owner_update_keeps_owner_in_members() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 1", "members": [ben.id.to_hex()] }))
            .to_request(),
    )
    .await;
    let uri = format!("/api/board/{}", created["board"]["_id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 2", "members": [ben.id.to_hex(), ben.id.to_hex()] }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["board"]["title"], "Sprint 2");
    assert_eq!(body["board"]["members"], json!([ben.id.to_hex(), ana.id.to_hex()]));

    let (_, body) = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&ana))
            .set_json(json!({ "members": [] }))
            .to_request(),
    )
    .await;
    assert_eq!(body["board"]["members"], json!([ana.id.to_hex()]));
    assert_eq!(body["board"]["title"], "Sprint 2");
}

#[actix_web::test]
async fn deleting_a_board_removes_its_tasks() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let ben = seed_user(&store, "ben", Role::User).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 1", "members": [ben.id.to_hex()] }))
            .to_request(),
    )
    .await;
    let board_id = created["board"]["_id"].as_str().unwrap().to_string();

    let (status, task) = send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ben))
            .set_json(json!({ "title": "Fix bug", "board": board_id }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["task"]["author"], ben.id.to_hex());
    let task_uri = format!("/api/task/{}", task["task"]["_id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/board/{board_id}"))
            .insert_header(bearer(&ben))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/board/{board_id}"))
            .insert_header(bearer(&ana))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(store.all_boards().is_empty());
    assert!(store.all_tasks().is_empty());

    let (status, _) = send(
        &app,
        TestRequest::get().uri(&task_uri).insert_header(bearer(&ben)).to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn failed_board_delete_leaves_everything_in_place() {
    let (store, state) = test_state();
    let ana = seed_user(&store, "ana", Role::User).await;
    let app = test_app!(state);

    let (_, created) = send(
        &app,
        TestRequest::post()
            .uri("/api/board/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Sprint 1" }))
            .to_request(),
    )
    .await;
    let board_id = created["board"]["_id"].as_str().unwrap().to_string();
    send(
        &app,
        TestRequest::post()
            .uri("/api/task/create")
            .insert_header(bearer(&ana))
            .set_json(json!({ "title": "Fix bug", "board": board_id }))
            .to_request(),
    )
    .await;

    store.fail_next_commit_after(1);
    let (status, body) = send(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/board/{board_id}"))
            .insert_header(bearer(&ana))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error deleting board");
    assert_eq!(store.all_boards().len(), 1);
    assert_eq!(store.all_tasks().len(), 1);
}
