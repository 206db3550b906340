// Friendly Debts - Web Server
// JSON API over the ledger operations with Axum

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use clap::Parser;
use friendly_debts::{
    logging, DebtForm, DebtSelection, Ledger, LedgerError, LedgerState, Settings,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::cors::CorsLayer;

#[derive(Parser)]
#[command(name = "friendly-debts-server", version, about = "JSON API for friendly-debts")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "FRIENDLY_DEBTS_ADDR", default_value = "127.0.0.1:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    ledger: Arc<Mutex<Ledger>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(LedgerError::invalid_input(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(LedgerError::invalid_input(rejection.body_text()))
    }
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidInput(_) | LedgerError::TotalOutOfRange(_) => StatusCode::BAD_REQUEST,
        LedgerError::ProfileNotFound(_) | LedgerError::DebtNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if self.0.is_invalid_input() {
            tracing::debug!(error = %self.0, "rejected input");
            "Invalid input".to_string()
        } else {
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                tracing::error!(error = %self.0, "ledger operation failed");
            }
            self.0.to_string()
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult = std::result::Result<Json<ApiResponse<LedgerState>>, ApiError>;

/// Run one ledger operation under the lock and return the new state
fn with_ledger<F>(state: &AppState, op: F) -> ApiResult
where
    F: FnOnce(&mut Ledger) -> friendly_debts::Result<LedgerState>,
{
    let mut ledger = state.ledger.lock().unwrap_or_else(PoisonError::into_inner);
    let next = op(&mut ledger)?;
    Ok(Json(ApiResponse::ok(next)))
}

#[derive(Deserialize)]
struct NameRequest {
    name: String,
}

#[derive(Deserialize)]
struct DebtRequest {
    /// Defaults to the active profile
    #[serde(default)]
    profile_id: Option<i64>,
    /// `dd.MM.yy`, defaults to today
    #[serde(default)]
    date: Option<String>,
    /// Number or numeric string
    #[serde(default)]
    amount: serde_json::Value,
    #[serde(default)]
    note: Option<String>,
}

impl DebtRequest {
    fn form(&self) -> DebtForm {
        let today = DebtForm::today();
        DebtForm {
            date: self.date.clone().unwrap_or(today.date),
            amount: amount_text(&self.amount),
            note: self.note.clone().unwrap_or_default(),
        }
    }
}

fn amount_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Deserialize)]
struct IdsRequest {
    ids: Vec<i64>,
}

#[derive(Deserialize, Default)]
struct SummarizeRequest {
    /// Missing means every debt of the active profile
    #[serde(default)]
    ids: Option<Vec<i64>>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/state - Profiles, active profile and its debts
async fn get_state(State(state): State<AppState>) -> ApiResult {
    with_ledger(&state, |ledger| Ok(ledger.state().clone()))
}

/// POST /api/profiles - Create a profile and switch to it
async fn create_profile(
    State(state): State<AppState>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    with_ledger(&state, |ledger| ledger.create_profile(&req.name).cloned())
}

/// PUT /api/profiles/active - Rename the active profile
async fn rename_profile(
    State(state): State<AppState>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    with_ledger(&state, |ledger| ledger.rename_profile(&req.name).cloned())
}

/// DELETE /api/profiles/active - Delete the active profile and its debts
async fn delete_profile(State(state): State<AppState>) -> ApiResult {
    with_ledger(&state, |ledger| ledger.delete_profile().cloned())
}

/// POST /api/profiles/:id/activate - Switch the active profile
async fn switch_profile(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult {
    let Path(id) = path?;
    with_ledger(&state, |ledger| ledger.switch_profile(id).cloned())
}

/// POST /api/debts - Add a debt
async fn add_debt(
    State(state): State<AppState>,
    payload: Result<Json<DebtRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    with_ledger(&state, |ledger| {
        let input = req.form().parse()?;
        let profile_id = req.profile_id.unwrap_or(ledger.state().active_id);
        ledger
            .add_debt(input.date, profile_id, input.amount, input.note.as_deref())
            .cloned()
    })
}

/// PUT /api/debts/:id - Edit a debt of the active profile, optionally
/// moving it to `profile_id`
async fn edit_debt(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<DebtRequest>, JsonRejection>,
) -> ApiResult {
    let Path(id) = path?;
    let Json(req) = payload?;
    with_ledger(&state, |ledger| {
        let input = req.form().parse()?;
        let profile_id = req.profile_id.unwrap_or(ledger.state().active_id);
        ledger
            .edit_debt(id, input.date, profile_id, input.amount, input.note.as_deref())
            .cloned()
    })
}

/// POST /api/debts/delete - Delete debts of the active profile
async fn delete_debts(
    State(state): State<AppState>,
    payload: Result<Json<IdsRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    with_ledger(&state, |ledger| ledger.delete_debts(&req.ids).cloned())
}

/// POST /api/debts/summarize - Merge some or all debts into one.
/// An empty body summarizes everything.
async fn summarize_debts(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let req = summarize_request(&body)?;
    let selection = match req.ids {
        Some(ids) => DebtSelection::Ids(ids),
        None => DebtSelection::All,
    };
    with_ledger(&state, |ledger| ledger.summarize_debts(selection).cloned())
}

fn summarize_request(body: &[u8]) -> friendly_debts::Result<SummarizeRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SummarizeRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| LedgerError::invalid_input(e.to_string()))
}

/// DELETE /api/debts - Clear all debts of the active profile
async fn clear_debts(State(state): State<AppState>) -> ApiResult {
    with_ledger(&state, |ledger| ledger.clear_debts().cloned())
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/state", get(get_state))
        .route("/profiles", post(create_profile))
        .route("/profiles/active", put(rename_profile).delete(delete_profile))
        .route("/profiles/:id/activate", post(switch_profile))
        .route("/debts", post(add_debt).delete(clear_debts))
        .route("/debts/:id", put(edit_debt))
        .route("/debts/delete", post(delete_debts))
        .route("/debts/summarize", post(summarize_debts))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.database_path = db;
    }
    settings.ensure_database_dir()?;
    logging::init_stderr(&settings.log_level)?;

    let ledger = Ledger::open_path(&settings.database_path, settings.ledger_options())
        .with_context(|| format!("Failed to open database {}", settings.database_path.display()))?;
    tracing::info!(db = %settings.database_path.display(), "database opened");

    let state = AppState {
        ledger: Arc::new(Mutex::new(ledger)),
    };

    let listener = tokio::net::TcpListener::bind(&cli.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.addr))?;

    tracing::info!(addr = %cli.addr, "server running");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let ledger = Ledger::open_in_memory(friendly_debts::LedgerOptions::default()).unwrap();
        AppState {
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_amount_text_accepts_numbers_and_strings() {
        assert_eq!(amount_text(&json!(12.5)), "12.5");
        assert_eq!(amount_text(&json!("-3,5")), "-3,5");
        assert_eq!(amount_text(&Value::Null), "");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&LedgerError::invalid_input("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&LedgerError::TotalOutOfRange(1)), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&LedgerError::ProfileNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&LedgerError::DebtNotFound(1)), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_debt_defaults_to_active_profile() {
        let state = test_state();

        let (status, body) = send(
            &state,
            "POST",
            "/api/debts",
            Some(json!({"date": "01.01.24", "amount": 10, "note": "cinema"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["debts"][0]["amount"], "10.00");
        assert_eq!(body["data"]["debts"][0]["date"], "01.01.24");
        assert_eq!(body["data"]["profiles"][0]["total"], "10.00");
    }

    #[tokio::test]
    async fn test_summarize_without_body_merges_everything() {
        let state = test_state();
        send(&state, "POST", "/api/debts", Some(json!({"date": "01.01.24", "amount": "2.25"}))).await;
        send(&state, "POST", "/api/debts", Some(json!({"date": "02.01.24", "amount": "-1"}))).await;

        let (status, body) = send(&state, "POST", "/api/debts/summarize", None).await;

        assert_eq!(status, StatusCode::OK);
        let debts = body["data"]["debts"].as_array().unwrap();
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0]["amount"], "1.25");
        assert_eq!(debts[0]["note"], "Summarized debts");
    }

    #[tokio::test]
    async fn test_summarize_rejects_malformed_body() {
        let state = test_state();
        send(&state, "POST", "/api/debts", Some(json!({"date": "01.01.24", "amount": 1}))).await;
        send(&state, "POST", "/api/debts", Some(json!({"date": "02.01.24", "amount": 2}))).await;

        let (status, body) = send(&state, "POST", "/api/debts/summarize", Some(json!({"ids": "x"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input");
        let (_, current) = send(&state, "GET", "/api/state", None).await;
        assert_eq!(current["data"]["debts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let state = test_state();

        let (status, body) = send(&state, "POST", "/api/profiles/999/activate", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Profile 999 not found");
    }

    #[tokio::test]
    async fn test_invalid_bodies_are_bad_requests() {
        let state = test_state();

        let (status, body) = send(&state, "POST", "/api/profiles", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "Invalid input"}));

        let (status, body) =
            send(&state, "POST", "/api/debts", Some(json!({"date": "01.01.24", "amount": "abc"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input");

        let (status, _) = send(&state, "POST", "/api/profiles/abc/activate", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_edit_moves_debt_to_requested_profile() {
        let state = test_state();
        let (_, body) = send(&state, "POST", "/api/debts", Some(json!({"date": "01.01.24", "amount": 5}))).await;
        let first = body["data"]["active_id"].as_i64().unwrap();
        let debt_id = body["data"]["debts"][0]["id"].as_i64().unwrap();

        let (_, body) = send(&state, "POST", "/api/profiles", Some(json!({"name": "Other"}))).await;
        let other = body["data"]["active_id"].as_i64().unwrap();
        send(&state, "POST", &format!("/api/profiles/{}/activate", first), None).await;

        let (status, body) = send(
            &state,
            "PUT",
            &format!("/api/debts/{}", debt_id),
            Some(json!({"date": "03.01.24", "amount": 5, "profile_id": other})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["debts"].as_array().unwrap().is_empty());
        let profiles = body["data"]["profiles"].as_array().unwrap();
        let total_of = |id: i64| {
            profiles
                .iter()
                .find(|p| p["id"].as_i64() == Some(id))
                .map(|p| p["total"].clone())
                .unwrap()
        };
        assert_eq!(total_of(first), "0.00");
        assert_eq!(total_of(other), "5.00");
    }
}
