//! API response models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable description of what went wrong
    #[schema(example = "Missing required column 'destination'")]
    pub error: String,
}
