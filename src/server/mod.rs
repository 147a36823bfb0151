//! HTTP trigger surface.
//!
//! Thin axum router that kicks off a full scrape run. Callers see structured
//! JSON in every case — never a stack trace. Bearer auth is enforced outside
//! development; the scheduled variant additionally checks a shared secret
//! header so cron services can be granted a separate credential.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
}

type ApiResponse = (StatusCode, Json<Value>);

fn ok_body(message: &str) -> ApiResponse {
    (
        StatusCode::OK,
        Json(json!({
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
            "status": "success",
        })),
    )
}

fn error_body(status: StatusCode, error: &str, details: Option<String>) -> ApiResponse {
    let mut body = json!({
        "error": error,
        "timestamp": Utc::now().to_rfc3339(),
    });
    if let Some(details) = details {
        body["details"] = Value::String(details);
    }
    (status, Json(body))
}

/// Bearer-token check. Development bypasses auth entirely; production with
/// no token configured is a configuration error, not an open endpoint.
fn authorize(config: &AppConfig, headers: &HeaderMap) -> Result<(), ApiResponse> {
    if config.server.is_development() {
        return Ok(());
    }

    let Some(expected) = config.server.api_token.as_deref() else {
        error!("api_token is not configured outside development");
        return Err(error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
            None,
        ));
    };

    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected) {
        Ok(())
    } else {
        Err(error_body(StatusCode::UNAUTHORIZED, "Unauthorized", None))
    }
}

/// Shared-secret check for the scheduled trigger.
fn check_cron_secret(config: &AppConfig, headers: &HeaderMap) -> Result<(), ApiResponse> {
    let Some(expected) = config.server.cron_secret.as_deref() else {
        error!("cron_secret is not configured; rejecting scheduled trigger");
        return Err(error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
            None,
        ));
    };

    let presented = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok());
    if presented == Some(expected) {
        Ok(())
    } else {
        Err(error_body(StatusCode::UNAUTHORIZED, "Unauthorized", None))
    }
}

async fn run_pipeline(state: &AppState) -> ApiResponse {
    let pipeline = Pipeline::new(state.config.as_ref().clone());
    match pipeline.run().await {
        Ok(stats) => {
            info!(
                "Triggered run finished: {} targets, {} records",
                stats.targets_processed, stats.records_upserted
            );
            ok_body(&format!(
                "Scraped {} records from {} targets ({} failed)",
                stats.records_upserted, stats.targets_processed, stats.targets_failed
            ))
        }
        Err(e) => {
            error!("Triggered run failed: {:#}", e);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Scraping failed",
                Some(e.to_string()),
            )
        }
    }
}

async fn healthz() -> ApiResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn trigger_scrape(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Err(resp) = authorize(&state.config, &headers) {
        return resp;
    }
    run_pipeline(&state).await
}

async fn trigger_scheduled(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Err(resp) = check_cron_secret(&state.config, &headers) {
        return resp;
    }
    run_pipeline(&state).await
}

pub fn build_router(config: AppConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/scrape", get(trigger_scrape).post(trigger_scrape))
        .route("/api/scrape/scheduled", post(trigger_scheduled))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.server.bind_addr.clone();
    let router = build_router(config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Trigger server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn prod_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.environment = "production".to_string();
        config.server.api_token = Some("secret-token".to_string());
        config.server.cron_secret = Some("cron-secret".to_string());
        config
    }

    #[test]
    fn development_bypasses_bearer_auth() {
        let config = AppConfig::default();
        assert!(authorize(&config, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn production_requires_bearer_token() {
        let config = prod_config();

        let denied = authorize(&config, &HeaderMap::new());
        assert_eq!(denied.unwrap_err().0, StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert_eq!(
            authorize(&config, &headers).unwrap_err().0,
            StatusCode::UNAUTHORIZED
        );

        headers.insert(AUTHORIZATION, "Bearer secret-token".parse().unwrap());
        assert!(authorize(&config, &headers).is_ok());
    }

    #[test]
    fn missing_token_config_is_a_server_error() {
        let mut config = prod_config();
        config.server.api_token = None;

        let denied = authorize(&config, &HeaderMap::new());
        assert_eq!(denied.unwrap_err().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn scheduled_trigger_validates_secret() {
        let config = prod_config();

        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, "wrong".parse().unwrap());
        assert_eq!(
            check_cron_secret(&config, &headers).unwrap_err().0,
            StatusCode::UNAUTHORIZED
        );

        headers.insert(CRON_SECRET_HEADER, "cron-secret".parse().unwrap());
        assert!(check_cron_secret(&config, &headers).is_ok());
    }

    #[test]
    fn scheduled_trigger_without_configured_secret_fails_closed() {
        let mut config = prod_config();
        config.server.cron_secret = None;
        assert_eq!(
            check_cron_secret(&config, &HeaderMap::new()).unwrap_err().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
