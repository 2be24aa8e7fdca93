//! HTTP API for the Vehicle Cost Engine.
//!
//! This module exposes a minimal REST API around the comparison engine
//! using the [`axum`](https://crates.io/crates/axum) framework.  Clients
//! submit an input snapshot and receive the per-method results in JSON.
//! The server calculates against the same policy tables as the library,
//! loaded from a directory at start-up.

use crate::config::ServerConfig;
use crate::engine::{compare, compare_batch, ComparisonReport, Scenario, ScenarioReport};
use crate::error::EngineError;
use crate::models::{lenient, TaxCalculation, UserInputs, Vehicle};
use crate::policy::PolicyRegistry;
use crate::tax::compute_tax;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Application state shared across requests.
pub struct AppState {
    pub policies: RwLock<PolicyRegistry>,
    pub config: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub inputs: UserInputs,
    #[serde(default)]
    pub policy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub policy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRequest {
    #[serde(default, deserialize_with = "lenient::number")]
    pub gross_income: f64,
    #[serde(default)]
    pub policy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyList {
    pub default: String,
    pub policies: Vec<String>,
}

/// Error body returned by every handler.
pub struct ApiError(StatusCode, String);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::UnknownPolicy(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({"error": self.1}));
        (self.0, body).into_response()
    }
}

/// Build the API router over an existing state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/compare", post(compare_handler))
        .route("/api/compare/batch", post(batch_handler))
        .route("/api/tax", post(tax_handler))
        .route("/api/policies", get(policies_handler))
        .route("/api/policies/reload", post(reload_handler))
        .route("/api/vehicles", get(vehicles_handler))
        .with_state(state)
}

/// Build the API router and load policies as described by `config`.
/// Returns the router and a handle to the state.
pub fn build_router(config: &ServerConfig) -> Result<(Router, Arc<AppState>)> {
    let registry = load_registry(config)
        .with_context(|| format!("loading policies from {:?}", config.policy_dir))?;
    let state = Arc::new(AppState {
        policies: RwLock::new(registry),
        config: config.clone(),
    });
    Ok((router(state.clone()), state))
}

fn load_registry(config: &ServerConfig) -> Result<PolicyRegistry, EngineError> {
    let mut registry = PolicyRegistry::load(&config.policy_dir)?;
    registry.set_default(&config.default_policy)?;
    Ok(registry)
}

/// Handler for POST /api/compare
async fn compare_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<ComparisonReport>, ApiError> {
    let policies = app_state.policies.read().await;
    let policy = policies.resolve(request.policy.as_deref())?;
    Ok(Json(compare(&request.inputs, policy)))
}

/// Handler for POST /api/compare/batch
async fn batch_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Vec<ScenarioReport>>, ApiError> {
    // Clone the policy out so the lock is not held across the blocking task.
    let policy = {
        let policies = app_state.policies.read().await;
        policies.resolve(request.policy.as_deref())?.clone()
    };
    let scenarios = request.scenarios;
    let reports = tokio::task::spawn_blocking(move || compare_batch(scenarios, &policy))
        .await
        .map_err(|err| {
            error!(error = %err, "batch comparison task failed");
            ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })?;
    Ok(Json(reports))
}

/// Handler for POST /api/tax
async fn tax_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<TaxRequest>,
) -> Result<Json<TaxCalculation>, ApiError> {
    let policies = app_state.policies.read().await;
    let policy = policies.resolve(request.policy.as_deref())?;
    Ok(Json(compute_tax(request.gross_income, policy)))
}

/// Handler for GET /api/policies
async fn policies_handler(State(app_state): State<Arc<AppState>>) -> Json<PolicyList> {
    let policies = app_state.policies.read().await;
    Json(PolicyList {
        default: policies.default_id().to_string(),
        policies: policies.ids(),
    })
}

/// Handler for POST /api/policies/reload
///
/// Re-reads the policy directory so a new financial year can be rolled
/// out without a restart.  The current registry is kept on failure.
async fn reload_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<PolicyList>, ApiError> {
    let registry = load_registry(&app_state.config)?;
    let list = PolicyList {
        default: registry.default_id().to_string(),
        policies: registry.ids(),
    };
    *app_state.policies.write().await = registry;
    info!(policies = list.policies.len(), "policies reloaded");
    Ok(Json(list))
}

/// Handler for GET /api/vehicles
async fn vehicles_handler() -> Json<Vec<Vehicle>> {
    Json(Vehicle::samples())
}

/// Launch the API server.  This function builds the router from the
/// given configuration and binds to its address.  It blocks until the
/// server terminates (e.g. when interrupted).
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let (router, _state) = build_router(config)?;
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server listening");
    axum::serve(listener, router).await.context("server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComparisonMethod;
    use crate::policy::AU_2024_25;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState {
            policies: RwLock::new(PolicyRegistry::with_builtins()),
            config: ServerConfig::default(),
        }))
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(value) => Body::from(value.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn compare_returns_all_methods() {
        let inputs = serde_json::to_value(UserInputs::default()).unwrap();
        let request = json!({"inputs": inputs});
        let (status, body) = send(app(), "POST", "/api/compare", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        let report: ComparisonReport = serde_json::from_value(body).unwrap();
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.policy, "AU-2023-24");
        assert_eq!(report.results[2].method, ComparisonMethod::Novated);
    }

    #[tokio::test]
    async fn compare_accepts_form_style_strings() {
        let body = json!({
            "inputs": {
                "fuelType": "ev",
                "driveAwayPrice": "59900",
                "ownershipYears": "3",
                "kmPerYear": "15000",
                "annualSalary": "100000",
                "novatedInterestRate": "9",
                "comparisonMethods": {"outright": false, "finance": false}
            },
            "policy": AU_2024_25
        });
        let (status, body) = send(app(), "POST", "/api/compare", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let report: ComparisonReport = serde_json::from_value(body).unwrap();
        assert_eq!(report.policy, AU_2024_25);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].breakdown.fbt, Some(0.0));
    }

    #[tokio::test]
    async fn unknown_policy_is_not_found() {
        let inputs = serde_json::to_value(UserInputs::default()).unwrap();
        let (status, body) = send(
            app(),
            "POST",
            "/api/compare",
            Some(json!({"inputs": inputs, "policy": "NZ-2024"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("NZ-2024"));
    }

    #[tokio::test]
    async fn batch_runs_each_scenario() {
        let scenarios: Vec<Value> = [35_000.0, 55_000.0]
            .iter()
            .map(|price| {
                let inputs = UserInputs {
                    drive_away_price: *price,
                    ..UserInputs::default()
                };
                json!({
                    "label": format!("price {price}"),
                    "inputs": serde_json::to_value(inputs).unwrap(),
                })
            })
            .collect();
        let (status, body) =
            send(app(), "POST", "/api/compare/batch", Some(json!({"scenarios": scenarios}))).await;
        assert_eq!(status, StatusCode::OK);
        let reports: Vec<ScenarioReport> = serde_json::from_value(body).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].label, "price 35000");
        assert!(
            reports[0].report.results[0].total_lifetime_cost
                < reports[1].report.results[0].total_lifetime_cost
        );
    }

    #[tokio::test]
    async fn tax_endpoint() {
        let (status, body) =
            send(app(), "POST", "/api/tax", Some(json!({"grossIncome": 45000.0}))).await;
        assert_eq!(status, StatusCode::OK);
        let tax: TaxCalculation = serde_json::from_value(body).unwrap();
        assert_eq!(tax.income_tax, 5_092.0);
    }

    #[tokio::test]
    async fn tax_endpoint_accepts_form_style_income() {
        let (status, body) =
            send(app(), "POST", "/api/tax", Some(json!({"grossIncome": "45000"}))).await;
        assert_eq!(status, StatusCode::OK);
        let tax: TaxCalculation = serde_json::from_value(body).unwrap();
        assert_eq!(tax.income_tax, 5_092.0);

        let (status, body) =
            send(app(), "POST", "/api/tax", Some(json!({"grossIncome": null}))).await;
        assert_eq!(status, StatusCode::OK);
        let tax: TaxCalculation = serde_json::from_value(body).unwrap();
        assert_eq!(tax.gross_income, 0.0);
        assert_eq!(tax.income_tax, 0.0);
    }

    #[tokio::test]
    async fn lists_policies_and_vehicles() {
        let (status, body) = send(app(), "GET", "/api/policies", None).await;
        assert_eq!(status, StatusCode::OK);
        let list: PolicyList = serde_json::from_value(body).unwrap();
        assert_eq!(list.default, "AU-2023-24");
        assert_eq!(list.policies.len(), 2);

        let (status, body) = send(app(), "GET", "/api/vehicles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), Vehicle::samples().len());
    }

    #[tokio::test]
    async fn reload_picks_up_new_policy_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            policy_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let (app, state) = build_router(&config).unwrap();
        std::fs::write(dir.path().join("next.json"), r#"{"id": "AU-2025-26"}"#).unwrap();

        let (status, body) = send(app, "POST", "/api/policies/reload", None).await;
        assert_eq!(status, StatusCode::OK);
        let list: PolicyList = serde_json::from_value(body).unwrap();
        assert!(list.policies.contains(&"AU-2025-26".to_string()));
        assert!(state.policies.read().await.get("AU-2025-26").is_ok());
    }

    #[test]
    fn build_router_rejects_unknown_default() {
        let config = ServerConfig {
            default_policy: "XX".to_string(),
            policy_dir: std::path::PathBuf::from("/definitely/not/here"),
            ..ServerConfig::default()
        };
        assert!(build_router(&config).is_err());
    }
}
