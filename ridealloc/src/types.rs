//! Common type definitions shared by every stage of an allocation run.
//!
//! - [`RideRequest`]: one input row, a company asking for rides to a destination
//! - [`Allocation`]: one output row, the rides approved for that company and destination
//! - [`RequestedTotals`] / [`ApprovedTotals`]: per-destination totals exchanged with the
//!   approval collaborator
//!
//! All of these are transient. They are built fresh for each run and dropped once the
//! output has been serialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Rides are granted in multiples of this many.
pub const CHUNK_SIZE: u64 = 100;

/// Per-destination sum of requested rides, as sent to the approval collaborator.
pub type RequestedTotals = BTreeMap<String, u64>;

/// Per-destination number of rides the approval collaborator authorized.
pub type ApprovedTotals = BTreeMap<String, u64>;

/// A company's request for rides to a single destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideRequest {
    pub company_name: String,
    pub destination: String,
    pub requested_count: u64,
}

impl RideRequest {
    pub fn new(company_name: impl Into<String>, destination: impl Into<String>, requested_count: u64) -> Self {
        Self {
            company_name: company_name.into(),
            destination: destination.into(),
            requested_count,
        }
    }
}

/// Rides approved for a company and destination. Never carries a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Allocation {
    pub company_name: String,
    pub destination: String,
    #[serde(rename = "number_of_rides_approved")]
    pub approved_count: u64,
}

impl Allocation {
    pub fn new(company_name: impl Into<String>, destination: impl Into<String>, approved_count: u64) -> Self {
        Self {
            company_name: company_name.into(),
            destination: destination.into(),
            approved_count,
        }
    }
}
