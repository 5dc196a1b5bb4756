//! Approval collaborator abstraction
//!
//! Before anything can be allocated, the per-destination totals that companies asked for are
//! sent to an approval authority, which answers with how many rides it authorizes for each
//! destination. This module defines the `ApprovalProvider` trait that hides who that authority
//! is, plus the two implementations the service ships with:
//!
//! - [`fixed_ratio::FixedRatioProvider`]: approves a fixed percentage of every request locally
//! - [`http::HttpApprovalProvider`]: asks a remote approval service over HTTP
//!
//! The call is all-or-nothing: a full mapping goes in and a full mapping comes back, or the
//! whole run fails. Nothing here retries.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    config::ApprovalConfig,
    types::{ApprovedTotals, RequestedTotals},
};

pub mod fixed_ratio;
pub mod http;

/// Create an approval provider from configuration
///
/// This is the single point where we convert config into provider instances.
pub fn create_provider(config: &ApprovalConfig) -> Result<Arc<dyn ApprovalProvider>> {
    let provider: Arc<dyn ApprovalProvider> = match config {
        ApprovalConfig::FixedRatio(fixed) => Arc::new(fixed_ratio::FixedRatioProvider::from(fixed)),
        ApprovalConfig::Http(remote) => Arc::new(http::HttpApprovalProvider::new(remote)?),
    };
    Ok(provider)
}

/// Result type for approval operations
pub type Result<T> = std::result::Result<T, ApprovalError>;

/// Errors that can occur while obtaining approval
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The approval authority could not be reached or refused to answer
    #[error("Approval service unavailable: {0}")]
    Unavailable(String),

    /// The approval authority answered with something that breaks the approval contract
    #[error("Malformed approval response: {0}")]
    Malformed(String),
}

/// Abstract approval authority
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    /// Ask for approval of the per-destination requested totals.
    ///
    /// Returns the approved total per destination. A destination left out of the answer is
    /// treated as approved for zero rides.
    async fn request_approval(&self, requested: &RequestedTotals) -> Result<ApprovedTotals>;
}

/// Check an approval answer against what was asked for.
///
/// Every approved destination must have been requested, and no destination may be approved
/// for more than was requested.
pub fn check_approval(requested: &RequestedTotals, approved: &ApprovedTotals) -> Result<()> {
    for (destination, &count) in approved {
        let Some(&asked) = requested.get(destination) else {
            return Err(ApprovalError::Malformed(format!(
                "approval for destination '{destination}' which was never requested"
            )));
        };
        if count > asked {
            return Err(ApprovalError::Malformed(format!(
                "approved {count} rides for '{destination}' but only {asked} were requested"
            )));
        }
    }
    Ok(())
}
