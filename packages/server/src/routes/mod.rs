//! Versioned API surface, mounted under `/api`.

mod v1;

use utoipa_axum::router::OpenApiRouter;

use crate::state::AppState;

/// Every versioned route; `/api/v1/...` once nested by the caller.
pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}
