//! Route table and shared application state

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::middleware::auth_middleware;
use crate::auth::JwtService;
use crate::business::services::{
    Services, SharedAccountService, SharedBusinessService, SharedFilingService, SharedInvitationService,
    SharedNotificationService, SharedReportService,
};
use crate::infrastructure::{Config, Database};
use crate::presentation::handlers;
use crate::shared::constants::http::REQUEST_TIMEOUT_SECONDS;
use crate::shared::{AppError, AppResult};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Database,
    pub jwt: JwtService,
    pub accounts: SharedAccountService,
    pub businesses: SharedBusinessService,
    pub filings: SharedFilingService,
    pub invitations: SharedInvitationService,
    pub reports: SharedReportService,
    pub notifications: SharedNotificationService,
}

impl AppState {
    /// Wires services, clients and the token verifier from configuration
    pub fn new(config: Arc<Config>, database: Database) -> AppResult<Self> {
        let jwt = JwtService::from_config(&config.jwt).map_err(AppError::Authentication)?;
        Self::with_jwt(config, database, jwt)
    }

    pub fn with_jwt(config: Arc<Config>, database: Database, jwt: JwtService) -> AppResult<Self> {
        let services = Services::new(config.clone(), database.clone())?;
        Ok(Self {
            accounts: Arc::new(services.accounts),
            businesses: Arc::new(services.businesses),
            filings: Arc::new(services.filings),
            invitations: Arc::new(services.invitations),
            reports: Arc::new(services.reports),
            notifications: Arc::new(services.notifications),
            config,
            database,
            jwt,
        })
    }
}

/// Builds the application router
pub fn create_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ops/readyz", get(handlers::health::readiness))
        .route("/v1/business/token/:token", get(handlers::business::business_by_token));

    let protected_routes = Router::new()
        // accounts
        .route("/v1/accounts", get(handlers::accounts::search_accounts))
        .route(
            "/v1/user/accounts",
            get(handlers::accounts::user_accounts).post(handlers::accounts::create_account),
        )
        // business
        .route("/v1/business/auth", post(handlers::business::create_auth_entity))
        .route("/v1/business/:identifier", get(handlers::business::business_details))
        .route("/v1/business/:identifier/tasks", get(handlers::business::pending_tasks))
        // filings
        .route(
            "/v1/business/:identifier/filings",
            get(handlers::filings::list_filings).post(handlers::filings::create_filing),
        )
        .route(
            "/v1/business/:identifier/filings/:filing_id",
            get(handlers::filings::get_filing)
                .post(handlers::filings::update_filing)
                .put(handlers::filings::update_filing),
        )
        .route(
            "/v1/business/:identifier/filings/:filing_id/payment",
            get(handlers::filings::payment_details).put(handlers::filings::refresh_payment),
        )
        .route(
            "/v1/business/:identifier/filings/:filing_id/reports/:report_type",
            get(handlers::filings::filing_report),
        )
        // internal
        .route(
            "/v1/internal/filings/:filing",
            get(handlers::internal::filings_by_status).patch(handlers::internal::complete_filing),
        )
        .route("/v1/internal/filings/:filing/notify", post(handlers::internal::notify))
        // invitations
        .route("/v1/invitations", get(handlers::invitations::search_invitations))
        .route("/v1/invitations/:invitation_id", delete(handlers::invitations::expire_invitation))
        // users
        .route("/v1/users", post(handlers::users::update_profile))
        .route(
            "/v1/users/tos",
            get(handlers::users::terms_of_use).patch(handlers::users::update_terms_of_use),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

