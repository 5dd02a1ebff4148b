// Inventaire - Web Server
// REST API over the inventory form, one controller per signed-in session

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use inventaire::{
    logging, AppConfig, AuthGate, Catalog, CatalogEntry, ExportFormat, FormError, FormState,
    InventoryForm, InventoryRecord, RecordStore, Selection, StoreError, SubmitOutcome,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

type SharedForm = Arc<Mutex<InventoryForm>>;

/// Shared application state
#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    store: Arc<dyn RecordStore>,
    gate: Arc<AuthGate>,
    sessions: Arc<Mutex<HashMap<Uuid, SharedForm>>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
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

// ============================================================================
// Errors
// ============================================================================

enum ApiError {
    Unauthorized(String),
    Rejected(StatusCode, String),
    Internal(String),
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        let message = err.to_string();
        match err {
            FormError::Auth(_) | FormError::NotSignedIn => ApiError::Unauthorized(message),
            FormError::Unavailable(_) | FormError::FullyInventoried => {
                ApiError::Rejected(StatusCode::CONFLICT, message)
            }
            FormError::NotSelected(_) | FormError::EmptySelection | FormError::Record(_) => {
                ApiError::Rejected(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            FormError::Store(StoreError::RemoteAccess { .. }) => {
                ApiError::Rejected(StatusCode::BAD_GATEWAY, message)
            }
            FormError::Store(_) | FormError::Export(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Rejected(status, m) => (status, m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Session plumbing
// ============================================================================

impl AppState {
    fn new_form(&self) -> InventoryForm {
        InventoryForm::new(self.catalog.clone(), self.store.clone())
    }

    fn session_token(headers: &HeaderMap) -> Option<Uuid> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| Uuid::parse_str(token.trim()).ok())
    }

    fn form_for(&self, headers: &HeaderMap) -> Result<SharedForm, ApiError> {
        let token = Self::session_token(headers)
            .ok_or_else(|| ApiError::Unauthorized("missing session token".into()))?;
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session table poisoned".into()))?;
        sessions
            .get(&token)
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("unknown session".into()))
    }
}

/// Run `f` against the caller's form on the blocking pool (store calls block).
async fn with_form<T, F>(state: &AppState, headers: &HeaderMap, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut InventoryForm) -> Result<T, FormError> + Send + 'static,
{
    let form = state.form_for(headers)?;
    tokio::task::spawn_blocking(move || {
        let mut form = form
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))?;
        f(&mut *form).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    identity: String,
    passphrase: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: Uuid,
    identity: String,
    state: FormState,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Deserialize)]
struct SelectionRequest {
    references: Vec<String>,
}

#[derive(Deserialize)]
struct QuantityRequest {
    reference: String,
    quantity: u32,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<ExportFormat>,
}

/// Snapshot of one session's form
#[derive(Serialize)]
struct FormView {
    identity: String,
    state: FormState,
    fully_inventoried: bool,
    available: Vec<CatalogEntry>,
    selection: Vec<Selection>,
}

impl From<&InventoryForm> for FormView {
    fn from(form: &InventoryForm) -> Self {
        Self {
            identity: form.session().identity.clone(),
            state: form.state(),
            fully_inventoried: form.is_fully_inventoried(),
            available: form.available().to_vec(),
            selection: form.selection().to_vec(),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/login - Authenticate and open a form session
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let mut form = state.new_form();
    let gate = state.gate.clone();

    let (form, result) = tokio::task::spawn_blocking(move || {
        let result = form.sign_in(&gate, &req.identity, &req.passphrase);
        (form, result)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let warning = match result {
        Ok(_) => None,
        Err(err @ (FormError::Auth(_) | FormError::NotSignedIn)) => return Err(err.into()),
        // Signed in, store unreachable: keep the session, report the problem
        Err(err) => Some(err.to_string()),
    };

    let token = Uuid::new_v4();
    let response = LoginResponse {
        token,
        identity: form.session().identity.clone(),
        state: form.state(),
        warning,
    };

    state
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session table poisoned".into()))?
        .insert(token, Arc::new(Mutex::new(form)));

    Ok(Json(ApiResponse::ok(response)))
}

/// POST /api/logout - Drop the caller's session
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    if let Some(token) = AppState::session_token(&headers) {
        state
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session table poisoned".into()))?
            .remove(&token);
    }
    Ok(Json(ApiResponse::ok(())))
}

/// GET /api/form - Re-read the store and return the form
async fn get_form(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<FormView> {
    let view = with_form(&state, &headers, |form| {
        form.refresh()?;
        Ok(FormView::from(&*form))
    })
    .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/form/selection - Replace the selected references
async fn set_selection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SelectionRequest>,
) -> ApiResult<FormView> {
    let view = with_form(&state, &headers, move |form| {
        form.refresh()?;
        form.select(&req.references)?;
        Ok(FormView::from(&*form))
    })
    .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/form/quantity - Set the quantity of one selected reference
async fn set_quantity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<QuantityRequest>,
) -> ApiResult<FormView> {
    let view = with_form(&state, &headers, move |form| {
        form.set_quantity(&req.reference, req.quantity)?;
        Ok(FormView::from(&*form))
    })
    .await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/form/review - Records a submit would write
async fn review(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<InventoryRecord>> {
    let records = with_form(&state, &headers, |form| form.review()).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// POST /api/form/submit - Persist the new records
async fn submit(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<SubmitOutcome> {
    let outcome = with_form(&state, &headers, |form| form.submit()).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/records - Every stored record
async fn get_records(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<InventoryRecord>> {
    let records = with_form(&state, &headers, |form| form.records()).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/export?format=xlsx|csv - Download the full inventory
async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format.unwrap_or_default();
    let bytes = with_form(&state, &headers, move |form| form.export(format)).await?;

    let Some(bytes) = bytes else {
        return Err(ApiError::Rejected(
            StatusCode::NOT_FOUND,
            "no inventory recorded yet".into(),
        ));
    };

    let disposition = format!("attachment; filename=\"{}\"", format.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, format.mime().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/form", get(get_form))
        .route("/form/selection", post(set_selection))
        .route("/form/quantity", post(set_quantity))
        .route("/form/review", post(review))
        .route("/form/submit", post(submit))
        .route("/records", get(get_records))
        .route("/export", get(export))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(None).context("Failed to load configuration")?;
    logging::init(config.logging.json);

    let catalog = Arc::new(config.catalog()?);
    let store = tokio::task::spawn_blocking({
        let config = config.clone();
        move || config.open_store()
    })
    .await??;

    let state = AppState {
        catalog,
        store,
        gate: Arc::new(config.auth_gate()),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    tracing::info!(bind = %config.server.bind, "inventaire server listening");
    println!("\n🚀 Server running on http://{}", config.server.bind);
    println!("   API: http://{}/api/form", config.server.bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
