// Open Graph card image

use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use socialspot_core::palette::render_card_svg;

/// Create OG image routes
pub fn routes() -> Router {
    Router::new().route("/v1/og/default.svg", get(default_card))
}

/// GET /v1/og/default.svg - Share card with freshly shuffled letter colours
#[utoipa::path(
    get,
    path = "/v1/og/default.svg",
    responses(
        (status = 200, description = "SVG card", content_type = "image/svg+xml", body = String)
    ),
    tag = "og"
)]
pub async fn default_card() -> impl IntoResponse {
    let svg = render_card_svg(&mut rand::thread_rng());
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        svg,
    )
}
