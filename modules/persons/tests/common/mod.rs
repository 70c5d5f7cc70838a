#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use modkit::{ConfigProvider, ModuleCtxBuilder, ModuleRegistry};
use persons::contract::model::{NewPerson, Person};
use persons::domain::service::{Service, ServiceConfig};
use persons::infra::storage::migrations::Migrator;
use persons::infra::storage::sea_orm_repo::SeaOrmPersonsRepository;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub struct TestConfig(pub HashMap<String, Value>);

impl ConfigProvider for TestConfig {
    fn get_module_config(&self, module_name: &str) -> Option<&Value> {
        self.0.get(module_name)
    }
}

/// Single-connection in-memory database, so every query sees the same data.
pub async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    Database::connect(opts).await.unwrap()
}

/// Service over a freshly migrated in-memory database.
pub async fn service() -> Service {
    let db = memory_db().await;
    Migrator::up(&db, None).await.unwrap();
    Service::new(
        Arc::new(SeaOrmPersonsRepository::new(db)),
        ServiceConfig::default(),
    )
}

pub fn new_person(name: &str, age: i32, email: &str) -> NewPerson {
    NewPerson {
        name: name.into(),
        age,
        email: email.into(),
    }
}

pub async fn seed(svc: &Service, rows: &[(&str, i32, &str)]) -> Vec<Person> {
    let mut out = Vec::new();
    for (name, age, email) in rows {
        out.push(svc.create(new_person(name, *age, email)).await.unwrap());
    }
    out
}

/// Alice/25/gmail, Bob/30/yahoo, Charlie/35/gmail.
pub const TRIO: &[(&str, i32, &str)] = &[
    ("Alice", 25, "alice@gmail.com"),
    ("Bob", 30, "bob@yahoo.com"),
    ("Charlie", 35, "charlie@gmail.com"),
];

// ---- full application ----

pub struct TestApp {
    pub router: Router,
    pub user_token: String,
    pub admin_token: String,
}

/// Ingress, auth and persons wired through the registry, with one regular
/// user and one admin logged in.
pub async fn build_app() -> TestApp {
    let db = memory_db().await;
    let cfg = TestConfig(HashMap::from([
        (
            "auth".to_string(),
            json!({ "jwt_secret": "persons-test-secret", "bcrypt_cost": 4 }),
        ),
        ("persons".to_string(), json!({ "default_page_size": 10 })),
    ]));

    let registry = ModuleRegistry::from_registrators(&[
        api_ingress::register,
        auth::register,
        persons::register,
    ])
    .unwrap();
    let ctx = ModuleCtxBuilder::new(CancellationToken::new())
        .with_db(db.clone())
        .with_config_provider(Arc::new(cfg))
        .build();

    registry.run_init_phase(&ctx).await.unwrap();
    registry.run_db_phase(&db).await.unwrap();
    let router = registry.run_rest_phase(&ctx, Router::new()).unwrap();

    let user_token = account(&router, "user1", "User").await;
    let admin_token = account(&router, "admin1", "Admin").await;
    TestApp {
        router,
        user_token,
        admin_token,
    }
}

async fn account(router: &Router, username: &str, role: &str) -> String {
    let resp = send(
        router,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "password1", "role": role })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": "password1" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("authorization", format!("Bearer {t}"));
    }
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    router.clone().oneshot(req.body(body).unwrap()).await.unwrap()
}

pub async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
