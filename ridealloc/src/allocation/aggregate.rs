use crate::{
    allocation::{AllocationError, Result},
    types::{RequestedTotals, RideRequest},
};

/// Sum requested rides per destination.
///
/// Destinations that never appear in `requests` are absent from the result. A destination
/// whose requests are all zero is present with a total of zero. Fails if a destination's total
/// does not fit in a `u64`.
pub fn aggregate(requests: &[RideRequest]) -> Result<RequestedTotals> {
    let mut totals = RequestedTotals::new();
    for request in requests {
        let total = totals.entry(request.destination.clone()).or_default();
        *total = total
            .checked_add(request.requested_count)
            .ok_or_else(|| AllocationError::TotalTooLarge {
                destination: request.destination.clone(),
            })?;
    }
    Ok(totals)
}
