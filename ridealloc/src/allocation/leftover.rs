use crate::types::CHUNK_SIZE;

/// Outcome of the leftover pass for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leftover {
    /// Indices of the requests that were granted one extra chunk, in sweep order.
    pub top_ups: Vec<usize>,
    /// Rides left undistributed. The caller drops them.
    pub dropped: u64,
}

/// Second pass: hand out what the proportional pass left over, one chunk at a time.
///
/// Requests are swept once, in input order. `owners[i]` names the (company, destination) pair
/// that request `i` belongs to, and `wanted`/`granted` hold each pair's total request and what it
/// has been allocated so far. A request earns one more chunk when its pair still has at least a
/// chunk of headroom (`wanted - granted >= CHUNK_SIZE`), so a company that filed several rows is
/// judged on everything it asked for and everything it already got. Requests without that
/// headroom are skipped and consume nothing. The sweep stops once less than a chunk remains, and
/// is never repeated, even if whole chunks are still left afterwards.
///
/// `granted` is updated in place with every chunk handed out.
pub fn leftover_pass(mut remaining: u64, owners: &[usize], wanted: &[u64], granted: &mut [u64]) -> Leftover {
    debug_assert_eq!(wanted.len(), granted.len());

    let mut top_ups = Vec::new();
    for (row, &pair) in owners.iter().enumerate() {
        if remaining < CHUNK_SIZE {
            break;
        }
        if wanted[pair].saturating_sub(granted[pair]) < CHUNK_SIZE {
            continue;
        }
        granted[pair] += CHUNK_SIZE;
        remaining -= CHUNK_SIZE;
        top_ups.push(row);
    }

    Leftover {
        top_ups,
        dropped: remaining,
    }
}
