//! REST surface of the opportunity lifecycle

use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{commands::DomainLogic, ports::auth::AuthPort, ports::database::DatabasePort};

pub mod auth;
pub mod error;
mod handlers;

pub struct AppState<D> {
    pub logic: DomainLogic<D>,
    pub auth: Arc<dyn AuthPort + Send + Sync>,
}

impl<D> AppState<D> {
    pub fn new(database: Arc<D>, auth: Arc<dyn AuthPort + Send + Sync>) -> Self {
        Self {
            logic: DomainLogic::new(database),
            auth,
        }
    }
}

impl<D> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            logic: self.logic.clone(),
            auth: self.auth.clone(),
        }
    }
}

pub fn router<D>(state: AppState<D>) -> Router
where
    D: DatabasePort + Send + Sync + 'static,
{
    use handlers::*;

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/opportunities",
            get(list_opportunities::<D>).post(create_opportunity::<D>),
        )
        .route("/api/opportunities/exclusive", get(list_exclusive_events::<D>))
        .route(
            "/api/opportunities/:id",
            get(get_opportunity::<D>)
                .put(update_opportunity::<D>)
                .delete(delete_opportunity::<D>),
        )
        .route("/api/opportunities/:id/join", post(join_opportunity::<D>))
        .route("/api/opportunities/:id/leave", post(leave_opportunity::<D>))
        .route(
            "/api/opportunities/:id/complete",
            post(complete_opportunity::<D>),
        )
        .route(
            "/api/opportunities/category/:category",
            get(opportunities_by_category::<D>),
        )
        .route(
            "/api/opportunities/location/:location",
            get(opportunities_by_location::<D>),
        )
        .route("/api/users/:id/stats", get(volunteer_stats::<D>))
        .route("/api/companies/:id/impact", get(company_impact::<D>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the web front end, any origin when none is configured
pub fn cors(origin: Option<HeaderValue>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    match origin {
        Some(origin) => cors.allow_origin(origin).allow_credentials(true),
        None => cors.allow_origin(Any),
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
