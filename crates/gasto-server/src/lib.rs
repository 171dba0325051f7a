//! Gasto Web Server
//!
//! Axum-based REST API for the gasto expense tracker.
//!
//! - Expense submission from text, image bytes, PDF bytes, or a remote URL
//! - Optional static bearer-token authentication (constant-time comparison)
//! - CORS locked to configured origins, same-origin when none are set
//! - JSON error bodies that never leak internals

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use gasto_core::ai::{AiClient, ExpenseAnalyzer};
use gasto_core::currency::CurrencyConverter;
use gasto_core::db::Database;
use gasto_core::document::{DocumentService, FileFetcher};
use gasto_core::processor::ExpenseProcessor;

mod handlers;

/// Request body ceiling for uploads (10 MB, the PDF limit)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Largest accepted `limit` value on list endpoints
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Runtime settings for the HTTP API
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Whether bearer-token authentication is required
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Accepted bearer tokens for the Authorization header
    pub api_keys: Vec<String>,
}

impl ServerConfig {
    /// Read server configuration from the environment.
    ///
    /// `GASTO_API_KEYS` holds comma-separated bearer tokens; authentication
    /// is enabled whenever at least one is present. `GASTO_ALLOWED_ORIGINS`
    /// holds comma-separated CORS origins.
    pub fn from_env() -> Self {
        let api_keys = csv_env("GASTO_API_KEYS");
        let allowed_origins = csv_env("GASTO_ALLOWED_ORIGINS");

        Self {
            require_auth: !api_keys.is_empty(),
            allowed_origins,
            api_keys,
        }
    }
}

/// Split a comma-separated environment variable into trimmed, non-empty parts
fn csv_env(var: &str) -> Vec<String> {
    std::env::var(var)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// State handed to every handler
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub processor: ExpenseProcessor,
    pub documents: DocumentService,
    pub fetcher: FileFetcher,
}

/// Middleware enforcing the static bearer-token scheme.
///
/// Tokens are checked with a constant-time comparison. `/api/health` is
/// exempt so liveness probes keep working once keys are configured.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    if request.uri().path() == "/api/health" {
        return next.run(request).await;
    }

    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "));

    match bearer {
        Some(token) if validate_api_key(token, &state.config.api_keys) => {
            next.run(request).await
        }
        _ => {
            warn!(path = %request.uri().path(), "Rejected request without a valid API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "Authentication required"
                })),
            )
                .into_response()
        }
    }
}

/// Check a presented token against every configured key without leaking
/// match position through timing.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided = provided.as_bytes();
    valid_keys.iter().any(|key| {
        let key = key.as_bytes();
        // ct_eq wants equal lengths; key length is not a secret here
        provided.len() == key.len() && bool::from(provided.ct_eq(key))
    })
}

/// Create the application router, building the AI provider and currency
/// converter from the environment.
///
/// Fails when `AI_PROVIDER` names an unknown provider or the selected
/// provider's API key is missing.
pub fn create_router(db: Database, config: ServerConfig) -> gasto_core::Result<Router> {
    let analyzer = AiClient::from_env()?;
    info!(
        model = analyzer.model(),
        host = analyzer.host(),
        "AI provider configured"
    );

    let currency = CurrencyConverter::from_env();
    info!(base_currency = currency.base_currency(), "Currency converter configured");

    Ok(create_router_with_client(db, config, analyzer, currency))
}

/// Create the application router with an explicit analyzer and converter
/// (used by tests and embedders that already hold one)
pub fn create_router_with_client(
    db: Database,
    config: ServerConfig,
    analyzer: AiClient,
    currency: CurrencyConverter,
) -> Router {
    let processor = ExpenseProcessor::new(db.clone(), analyzer, currency);

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        processor,
        documents: DocumentService::new(),
        fetcher: FileFetcher::new(),
    });

    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Expense submission
        .route("/expenses/text", post(handlers::submit_text))
        .route("/expenses/image", post(handlers::submit_image))
        .route("/expenses/document", post(handlers::submit_document))
        .route("/expenses/fetch", post(handlers::submit_fetch))
        // Expense queries
        .route("/expenses", get(handlers::list_expenses))
        .route("/expenses/:id", get(handlers::get_expense))
        // Categories
        .route("/categories", get(handlers::list_categories))
        // Reports and export
        .route("/reports/monthly", get(handlers::monthly_report))
        .route("/export/expenses", get(handlers::export_expenses));

    // Without configured origins no Access-Control-Allow-Origin is ever
    // emitted, which amounts to same-origin only
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind the listener and run the API until the process exits
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.require_auth {
        info!(
            keys = config.api_keys.len(),
            "Bearer-token authentication enabled"
        );
    } else {
        warn!("⚠️  Authentication disabled - set GASTO_API_KEYS before exposing this to a network");
    }

    let app = create_router(db, config)?;
    let addr = format!("{}:{}", host, port);

    info!("Listening at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// HTTP error mapping
// ============================================================================

/// Error carried out of handlers, holding the status and client-safe message
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The underlying error goes to the log, never to the client
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Map core errors onto HTTP statuses: invalid input → 400, missing rows →
/// 404, provider failures → 502, everything else → sanitized 500.
impl From<gasto_core::Error> for AppError {
    fn from(err: gasto_core::Error) -> Self {
        match err {
            gasto_core::Error::Input(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                message: msg,
                internal: None,
            },
            gasto_core::Error::NotFound(msg) => Self {
                status: StatusCode::NOT_FOUND,
                message: msg,
                internal: None,
            },
            gasto_core::Error::Analysis(msg) => Self {
                status: StatusCode::BAD_GATEWAY,
                message: msg,
                internal: None,
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other.into()),
            },
        }
    }
}
