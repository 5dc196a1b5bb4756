//! One allocation run, end to end.
//!
//! Requests are aggregated per destination, sent to the approval provider, checked against what
//! was asked for, and distributed back to the companies. Any failure aborts the run and no
//! partial output is produced.

use crate::{
    allocation,
    approval::{self, ApprovalProvider},
    errors, records,
    types::{Allocation, RideRequest},
};
use std::path::Path;

/// Run the allocation pipeline over parsed requests.
#[tracing::instrument(skip_all, fields(requests = requests.len()))]
pub async fn run_allocation(requests: &[RideRequest], provider: &dyn ApprovalProvider) -> errors::Result<Vec<Allocation>> {
    let requested = allocation::aggregate(requests)?;
    tracing::debug!(destinations = requested.len(), "Aggregated requested totals");

    let approved = provider.request_approval(&requested).await?;
    approval::check_approval(&requested, &approved)?;

    let allocations = allocation::distribute(&approved, requests);

    tracing::info!(
        destinations = requested.len(),
        requested = requested.values().map(|&n| u128::from(n)).sum::<u128>(),
        approved = approved.values().map(|&n| u128::from(n)).sum::<u128>(),
        allocated = allocations.iter().map(|a| u128::from(a.approved_count)).sum::<u128>(),
        rows = allocations.len(),
        "Allocation run complete"
    );

    Ok(allocations)
}

/// Read requests from `input`, run the pipeline, and write the allocation file to `output`.
///
/// `output` is only created once the run has succeeded.
#[tracing::instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn allocate_file(input: &Path, output: &Path, provider: &dyn ApprovalProvider) -> errors::Result<Vec<Allocation>> {
    let requests = records::read_requests_from_path(input)?;
    let allocations = run_allocation(&requests, provider).await?;
    records::write_allocations_to_path(output, &allocations)?;
    Ok(allocations)
}
