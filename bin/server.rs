// Wedding RSVP - Web Server
// Thin REST layer over the core library (Axum)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tower_http::cors::CorsLayer;
use wedding_rsvp::{
    get_guest, insert_guest, open_database, CodeType, Config, ErrorCatalog, Guest,
    InvitationCode, InvitationRegistry, LogNotifier, MemberEntry, NewGuest, RosterSummary,
    RsvpError, RsvpOrchestrator, RsvpOutcome, RsvpSubmission, Rsvp,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    orchestrator: Arc<RsvpOrchestrator>,
    catalog: Arc<RwLock<ErrorCatalog>>,
}

impl AppState {
    fn db(&self) -> MutexGuard<'_, Connection> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_key: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
                error_key: None,
            }),
        )
            .into_response()
    }
}

/// Core error rendered through the error catalog
struct ApiError {
    status: StatusCode,
    key: String,
    message: String,
}

impl ApiError {
    fn from_core(state: &AppState, err: RsvpError) -> Self {
        let def = match state.catalog.read() {
            Ok(catalog) => catalog.describe(&err),
            Err(poisoned) => poisoned.into_inner().describe(&err),
        };
        if def.status >= 500 {
            error!("Request failed: {}", err);
        } else {
            info!("Request rejected ({}): {}", def.key, err);
        }
        ApiError {
            status: StatusCode::from_u16(def.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            key: def.key,
            message: def.message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(self.message),
                error_key: Some(self.key),
            }),
        )
            .into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn respond<T: Serialize>(state: &AppState, result: wedding_rsvp::Result<T>) -> ApiResult {
    result
        .map(ApiResponse::ok)
        .map_err(|e| ApiError::from_core(state, e))
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct IssueCodeRequest {
    #[serde(default)]
    code_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyRsvpRequest {
    members: Vec<MemberEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SoloRsvpRequest {
    attending: bool,
    #[serde(default)]
    plus_one_name: Option<String>,
    #[serde(default)]
    dietary_restrictions: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// POST /api/guests - Register a guest
async fn create_guest(State(state): State<AppState>, Json(body): Json<NewGuest>) -> ApiResult {
    let result: wedding_rsvp::Result<Guest> = insert_guest(&state.db(), &body);
    respond(&state, result)
}

/// GET /api/guests/:id - Fetch a guest
async fn fetch_guest(State(state): State<AppState>, Path(guest_id): Path<i64>) -> ApiResult {
    let result = get_guest(&state.db(), guest_id);
    respond(&state, result)
}

/// GET /api/guests/:id/codes - Every code the guest owns
async fn list_codes(State(state): State<AppState>, Path(guest_id): Path<i64>) -> ApiResult {
    let result: wedding_rsvp::Result<Vec<InvitationCode>> =
        registry(&state).list_for_guest(&state.db(), guest_id);
    respond(&state, result)
}

/// POST /api/guests/:id/codes - Issue a code
async fn issue_code(
    State(state): State<AppState>,
    Path(guest_id): Path<i64>,
    body: Option<Json<IssueCodeRequest>>,
) -> ApiResult {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let result = request
        .code_type
        .as_deref()
        .map(CodeType::parse)
        .transpose()
        .and_then(|code_type| {
            registry(&state).issue(&state.db(), guest_id, code_type.unwrap_or(CodeType::Primary))
        });
    respond(&state, result)
}

/// POST /api/guests/:id/codes/replacement - Issue a replacement code
async fn issue_replacement(State(state): State<AppState>, Path(guest_id): Path<i64>) -> ApiResult {
    let result = registry(&state).issue_replacement(&state.db(), guest_id);
    respond(&state, result)
}

/// POST /api/guests/:id/codes/revoke - Expire every code of a guest
async fn revoke_codes(State(state): State<AppState>, Path(guest_id): Path<i64>) -> ApiResult {
    let result = registry(&state).invalidate_all(&state.db(), guest_id);
    respond(&state, result)
}

/// GET /api/codes/:code - Validate a code
async fn validate_code(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult {
    let result = registry(&state).validate(&state.db(), &code);
    respond(&state, result)
}

/// POST /api/codes/:code/used - Mark a code as used
async fn mark_code_used(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult {
    let result = registry(&state).mark_used(&state.db(), &code).map(|_| "OK");
    respond(&state, result)
}

/// POST /api/rsvp - Code-driven RSVP submission
async fn submit_rsvp(State(state): State<AppState>, Json(body): Json<RsvpSubmission>) -> ApiResult {
    let result: wedding_rsvp::Result<RsvpOutcome> =
        state.orchestrator.submit(&mut state.db(), &body);
    respond(&state, result)
}

/// POST /api/families/:id/rsvp - Reconcile a family roster
async fn submit_family_rsvp(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Json(body): Json<FamilyRsvpRequest>,
) -> ApiResult {
    let result: wedding_rsvp::Result<RosterSummary> =
        state
            .orchestrator
            .submit_family_rsvp(&mut state.db(), group_id, &body.members);
    respond(&state, result)
}

/// POST /api/guests/:id/rsvp - Solo RSVP
async fn submit_solo_rsvp(
    State(state): State<AppState>,
    Path(guest_id): Path<i64>,
    Json(body): Json<SoloRsvpRequest>,
) -> ApiResult {
    let result: wedding_rsvp::Result<Rsvp> = state
        .orchestrator
        .submit_solo_rsvp(
            &mut state.db(),
            guest_id,
            body.attending,
            body.plus_one_name.as_deref(),
            body.dietary_restrictions.as_deref(),
        )
        .map(|saved| saved.rsvp);
    respond(&state, result)
}

/// POST /api/admin/errors/refresh - Reload client-facing error wording
async fn refresh_error_catalog(State(state): State<AppState>) -> ApiResult {
    let result = {
        let conn = state.db();
        match state.catalog.write() {
            Ok(mut catalog) => catalog.refresh(&conn),
            Err(poisoned) => poisoned.into_inner().refresh(&conn),
        }
    };
    respond(&state, result)
}

fn registry(state: &AppState) -> &InvitationRegistry {
    state.orchestrator.registry()
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("💒 Wedding RSVP - Web Server");

    let config = Config::from_env()?;
    let conn = open_database(&config.db_path)?;
    info!("✓ Database opened: {:?}", config.db_path);

    let mut catalog = ErrorCatalog::new();
    catalog.refresh(&conn)?;

    let orchestrator = RsvpOrchestrator::new(
        InvitationRegistry::from_config(&config),
        Box::new(LogNotifier),
    );

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        orchestrator: Arc::new(orchestrator),
        catalog: Arc::new(RwLock::new(catalog)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/guests", post(create_guest))
        .route("/guests/:id", get(fetch_guest))
        .route("/guests/:id/codes", get(list_codes).post(issue_code))
        .route("/guests/:id/codes/replacement", post(issue_replacement))
        .route("/guests/:id/codes/revoke", post(revoke_codes))
        .route("/guests/:id/rsvp", post(submit_solo_rsvp))
        .route("/codes/:code", get(validate_code))
        .route("/codes/:code/used", post(mark_code_used))
        .route("/rsvp", post(submit_rsvp))
        .route("/families/:id/rsvp", post(submit_family_rsvp))
        .route("/admin/errors/refresh", post(refresh_error_catalog))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("🚀 Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
