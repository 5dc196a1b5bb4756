//! The allocation core: turning approved per-destination quotas into per-company grants.
//!
//! An allocation run works destination by destination. For each one, the approved quota is
//! first split in proportion to what each company requested, rounded down to whole chunks of
//! [`CHUNK_SIZE`](crate::types::CHUNK_SIZE) rides ([`proportional_pass`]). Whatever the rounding left behind is then
//! handed out one chunk per request, in input order ([`leftover_pass`]). Less than a chunk is
//! never handed out.
//!
//! Everything here is pure: no I/O, no shared state, and the same ordered input always yields
//! the same output.

mod aggregate;
mod leftover;
mod proportional;

pub use aggregate::aggregate;
pub use leftover::{Leftover, leftover_pass};
pub use proportional::proportional_pass;

use crate::types::{Allocation, ApprovedTotals, CHUNK_SIZE, RideRequest};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Result type for allocation operations.
pub type Result<T> = std::result::Result<T, AllocationError>;

/// Errors that can occur while allocating.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The rides requested for one destination add up to more than a `u64` can hold
    #[error("Total rides requested for destination '{destination}' is too large")]
    TotalTooLarge { destination: String },
}

/// Distribute approved quotas across the requests that asked for them.
///
/// Destinations are visited in the order they first appear in `requests`. For each one, the
/// proportional grants come first, one row per request in input order, followed by one
/// [`CHUNK_SIZE`] row per leftover top-up in sweep order. A company can therefore appear more
/// than once for a destination. Destinations with no approved quota, and approved destinations
/// nobody asked for, produce nothing. Zero grants are never emitted.
///
/// Totals are recomputed from `requests` rather than taken from [`aggregate`], so this can be
/// called on its own.
pub fn distribute(approved: &ApprovedTotals, requests: &[RideRequest]) -> Vec<Allocation> {
    let mut allocations = Vec::new();

    for (destination, group) in group_by_destination(requests) {
        let Some(&quota) = approved.get(destination) else {
            continue;
        };

        let requested: Vec<u64> = group.iter().map(|r| r.requested_count).collect();
        let shares = proportional_pass(quota, &requested);
        let remaining = quota.saturating_sub(shares.iter().sum());

        debug!(
            destination = %destination,
            quota = quota,
            companies = group.len(),
            remaining = remaining,
            "Proportional pass complete"
        );

        let pairs = CompanyPairs::new(&group, &shares);
        let mut granted = pairs.granted;
        let leftover = leftover_pass(remaining, &pairs.owners, &pairs.wanted, &mut granted);

        debug!(
            destination = %destination,
            top_ups = leftover.top_ups.len(),
            dropped = leftover.dropped,
            "Leftover pass complete"
        );

        allocations.extend(
            group
                .iter()
                .zip(shares)
                .filter(|(_, count)| *count > 0)
                .map(|(request, count)| Allocation::new(request.company_name.clone(), destination, count)),
        );
        allocations.extend(
            leftover
                .top_ups
                .into_iter()
                .map(|row| Allocation::new(group[row].company_name.clone(), destination, CHUNK_SIZE)),
        );
    }

    allocations
}

/// Requests of one destination folded per company.
struct CompanyPairs {
    /// Pair index of each request, in input order
    owners: Vec<usize>,
    /// Total requested per pair
    wanted: Vec<u64>,
    /// Proportional grants per pair
    granted: Vec<u64>,
}

impl CompanyPairs {
    fn new(group: &[&RideRequest], shares: &[u64]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut pairs = Self {
            owners: Vec::with_capacity(group.len()),
            wanted: Vec::new(),
            granted: Vec::new(),
        };

        for (request, &share) in group.iter().zip(shares) {
            let pair = *index.entry(request.company_name.as_str()).or_insert_with(|| {
                pairs.wanted.push(0);
                pairs.granted.push(0);
                pairs.wanted.len() - 1
            });
            pairs.owners.push(pair);
            pairs.wanted[pair] = pairs.wanted[pair].saturating_add(request.requested_count);
            // Shares never exceed the quota in total
            pairs.granted[pair] += share;
        }

        pairs
    }
}

/// Group requests by destination, keeping destinations in first-appearance order.
fn group_by_destination(requests: &[RideRequest]) -> Vec<(&str, Vec<&RideRequest>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&RideRequest>)> = Vec::new();

    for request in requests {
        let destination = request.destination.as_str();
        match index.get(destination) {
            Some(&i) => groups[i].1.push(request),
            None => {
                index.insert(destination, groups.len());
                groups.push((destination, vec![request]));
            }
        }
    }

    groups
}
