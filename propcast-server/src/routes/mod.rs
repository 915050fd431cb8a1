// File: propcast-server/src/routes/mod.rs

pub mod accounts;
pub mod analyses;
pub mod debug;
pub mod payments;
pub mod proxy;
pub mod sharing;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Every route of the public API. The reset, listing and test-mail routes
/// are only mounted when `state.debug_routes` is set.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/register/", post(accounts::register))
        .route("/login/", post(accounts::login))
        .route("/refresh/", post(accounts::refresh))
        .route("/profile/", get(accounts::get_profile).put(accounts::update_profile))
        .route("/perplexity/", post(proxy::perplexity))
        .route("/notion/format/", post(proxy::notion_format))
        .route("/generate-agent-description/", post(proxy::generate_agent_description))
        .route("/analyses/save/", post(analyses::save))
        .route("/analyses/recent/", get(analyses::recent))
        .route("/analyses/{id}/", get(analyses::get_one))
        .route("/analyses/{id}/delete/", delete(analyses::delete_one))
        .route("/analyses/{id}/update/", put(analyses::update_one))
        .route("/payments/create-payment-intent/", post(payments::create_payment_intent))
        .route("/payments/webhook/", post(payments::webhook))
        .route("/payments/history/", get(payments::history))
        .route("/share/", post(sharing::share))
        .route("/share/stats/", get(sharing::stats))
        .route("/shared/{share_id}/", get(sharing::shared_view));

    if state.debug_routes {
        app = app
            .route("/reset-share-stats/", post(debug::reset_share_stats))
            .route("/debug/shares/", get(debug::list_shares))
            .route("/test-email/", post(debug::test_email));
    }

    app.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
