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
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub struct TestConfig(pub HashMap<String, Value>);

impl ConfigProvider for TestConfig {
    fn get_module_config(&self, module_name: &str) -> Option<&Value> {
        self.0.get(module_name)
    }
}

/// Single-connection in-memory database; every pooled connection would
/// otherwise see its own empty database.
pub async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    Database::connect(opts).await.unwrap()
}

/// Ingress + auth wired through the registry, with migrations applied.
pub async fn build_app() -> Router {
    let db = memory_db().await;
    let cfg = TestConfig(HashMap::from([(
        "auth".to_string(),
        json!({ "jwt_secret": "integration-secret", "bcrypt_cost": 4 }),
    )]));

    let registry =
        ModuleRegistry::from_registrators(&[api_ingress::register, auth::register]).unwrap();
    let ctx = ModuleCtxBuilder::new(CancellationToken::new())
        .with_db(db.clone())
        .with_config_provider(Arc::new(cfg))
        .build();

    registry.run_init_phase(&ctx).await.unwrap();
    registry.run_db_phase(&db).await.unwrap();
    registry.run_rest_phase(&ctx, Router::new()).unwrap()
}

pub async fn send(
    app: &Router,
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
    app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
}

pub async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn register(app: &Router, username: &str, password: &str, role: &str) -> StatusCode {
    send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": password, "role": role })),
    )
    .await
    .status()
}

pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let resp = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}
