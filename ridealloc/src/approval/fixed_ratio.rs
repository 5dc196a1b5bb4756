//! Fixed-ratio approval provider
//!
//! Approves the same percentage of every destination's requested total, rounded down.
//! Needs no external service, so it is the default and the one used in development.

use async_trait::async_trait;

use crate::{
    approval::{ApprovalProvider, Result},
    config::FixedRatioConfig,
    types::{ApprovedTotals, RequestedTotals},
};

/// Approval provider that grants `percent`% of each request
pub struct FixedRatioProvider {
    percent: u64,
}

impl FixedRatioProvider {
    /// Create a new fixed-ratio provider. Percentages above 100 are clamped to 100.
    pub fn new(percent: u64) -> Self {
        Self { percent: percent.min(100) }
    }

    fn approve(&self, requested: u64) -> u64 {
        // percent <= 100, so the result never exceeds `requested`
        (u128::from(requested) * u128::from(self.percent) / 100) as u64
    }
}

impl From<&FixedRatioConfig> for FixedRatioProvider {
    fn from(config: &FixedRatioConfig) -> Self {
        Self::new(config.percent)
    }
}

#[async_trait]
impl ApprovalProvider for FixedRatioProvider {
    async fn request_approval(&self, requested: &RequestedTotals) -> Result<ApprovedTotals> {
        let approved: ApprovedTotals = requested
            .iter()
            .map(|(destination, &count)| (destination.clone(), self.approve(count)))
            .collect();

        tracing::debug!(
            percent = self.percent,
            destinations = approved.len(),
            "Fixed-ratio approval granted"
        );

        Ok(approved)
    }
}
