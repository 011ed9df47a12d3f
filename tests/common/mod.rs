#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web};
use chrono::Duration;
use serde_json::Value;

use taskboard::app_state::AppState;
use taskboard::auth::create_jwt;
use taskboard::config::{Config, StorageBackend};
use taskboard::models::{Role, User};
use taskboard::store::{MemoryStore, Store, Write};

pub const PASSWORD: &str = "correct horse";

/// Build the full API around `$state`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(taskboard::routes::configure),
        )
        .await
    };
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        frontend_origin: "http://localhost:5173".to_string(),
        storage: StorageBackend::Memory,
        mongo_uri: None,
        database_name: "taskboard-test".to_string(),
        jwt_secret: "integration-secret".to_string(),
        jwt_expiry_hours: 1,
        bcrypt_cost: 4,
    }
}

pub fn test_state() -> (Arc<MemoryStore>, web::Data<AppState>) {
    let store = Arc::new(MemoryStore::new());
    let state = web::Data::new(AppState::new(store.clone(), test_config()));
    (store, state)
}

/// Insert a user whose password is [`PASSWORD`].
pub async fn seed_user(store: &MemoryStore, name: &str, role: Role) -> User {
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    let mut user = User::new(name.to_string(), format!("{name}@example.com"), hash);
    user.role = role;
    store.commit(Write::InsertUser(user.clone()).into()).await.unwrap();
    user
}

pub fn bearer(user: &User) -> (header::HeaderName, String) {
    bearer_with_ttl(user, Duration::hours(1))
}

pub fn bearer_with_ttl(user: &User, ttl: Duration) -> (header::HeaderName, String) {
    let config = test_config();
    let token = create_jwt(&user.id.to_hex(), &config.jwt_secret, ttl).unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub async fn reload(store: &MemoryStore, user: &User) -> Option<User> {
    store.user(user.id).await.unwrap()
}

/// Run one request and decode the JSON body (`Null` when empty).
pub async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}
