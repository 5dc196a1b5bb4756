use crate::types::CHUNK_SIZE;

/// First pass: split `quota` across `requested` in proportion to each request, rounding every
/// share down to a whole number of chunks and capping it at the amount requested.
///
/// Integer arithmetic throughout, so the result is `floor(quota * r / (total * CHUNK_SIZE)) *
/// CHUNK_SIZE` exactly, with no platform-dependent rounding near chunk boundaries. A zero
/// total allocates nothing.
pub fn proportional_pass(quota: u64, requested: &[u64]) -> Vec<u64> {
    let total: u128 = requested.iter().map(|&r| u128::from(r)).sum();
    if total == 0 {
        return vec![0; requested.len()];
    }

    let chunk = u128::from(CHUNK_SIZE);
    requested
        .iter()
        .map(|&r| {
            let chunks = u128::from(quota) * u128::from(r) / (total * chunk);
            // r <= total, so the share never exceeds quota and fits back into a u64
            let share = (chunks * chunk) as u64;
            share.min(r)
        })
        .collect()
}
