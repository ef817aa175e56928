use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::database::connection::DatabaseManager;
use crate::database::models::{Code, StockLevel};
use crate::store::PoolKind;
use chrono::{DateTime, Utc};

pub const LIVENESS_TEXT: &str = "Bot is running...";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub stock: Vec<PoolStock>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PoolStock {
    pub pool: PoolKind,
    #[serde(flatten)]
    pub level: StockLevel,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = AppState {
            db,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/", get(root))
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

// Hosting platforms probe this to keep the process alive
async fn root() -> &'static str {
    LIVENESS_TEXT
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();

    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Health check database ping failed: {}", e);
            "unhealthy"
        }
    };

    let response_time_ms = start.elapsed().as_millis() as u64;
    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    let mut stock = Vec::new();
    if db_status == "healthy" {
        for pool in PoolKind::ALL {
            match Code::stock(&state.db.pool, pool.as_str()).await {
                Ok(level) => stock.push(PoolStock { pool, level }),
                Err(e) => tracing::warn!("Could not read {} stock: {}", pool, e),
            }
        }
    }

    let health_response = HealthResponse {
        status: db_status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: db_status.to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        stock,
        uptime_seconds: uptime,
    };

    if health_response.status == "healthy" {
        Ok(Json(health_response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match state.db.ping().await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use tempfile::TempDir;

    async fn create_test_health_service() -> (HealthService, Arc<DatabaseManager>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let db = Arc::new(
            DatabaseManager::new(&db_url)
                .await
                .expect("Failed to create test database")
        );

        db.run_migrations().await.expect("Failed to run migrations");

        (HealthService::new(db.clone()), db, temp_dir)
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let (health_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), LIVENESS_TEXT);
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_stock() {
        let (health_service, db, _temp_dir) = create_test_health_service().await;
        Code::insert_many(&db.pool, "discount", &["A".to_string(), "B".to_string()])
            .await
            .expect("Failed to seed codes");
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let health_response: HealthResponse = response.json();
        assert_eq!(health_response.status, "healthy");
        assert_eq!(health_response.database.status, "healthy");
        assert_eq!(health_response.version, env!("CARGO_PKG_VERSION"));

        let discount = health_response
            .stock
            .iter()
            .find(|s| s.pool == PoolKind::Discount)
            .expect("discount stock missing");
        assert_eq!(discount.level.available, 2);
        assert_eq!(discount.level.issued, 0);
        let drink = health_response
            .stock
            .iter()
            .find(|s| s.pool == PoolKind::Drink)
            .expect("drink stock missing");
        assert_eq!(drink.level.available, 0);
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let (health_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/ready").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let ready_response: String = response.json();
        assert_eq!(ready_response, "ready");
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let (health_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/live").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let alive_response: String = response.json();
        assert_eq!(alive_response, "alive");
    }
}
