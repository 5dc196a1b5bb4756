//! OpenAPI documentation for the HTTP surface.
//!
//! Served as JSON at `/api-docs/openapi.json` with an interactive reference at `/docs`.

use utoipa::OpenApi;

use crate::{api, types};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ride Allocation API",
        description = "Allocates approved ride quotas between the companies that requested them."
    ),
    paths(api::handlers::allocations::allocate_rides),
    components(schemas(api::models::ErrorResponse, types::Allocation)),
    tags((name = "allocations", description = "Ride request upload and allocation download"))
)]
pub struct ApiDoc;
