//! BatchForwarder trait - agent output interface
//!
//! Defines the abstract interface for shipping classified batches to the store.

use crate::{ClassifiedReading, ContractError, PersistedRecord};

/// Batch output trait
///
/// One call is one request: there are no partial sends. Implementations do not retry;
/// the calling loop owns the retry/backoff policy.
#[trait_variant::make(BatchForwarder: Send)]
pub trait LocalBatchForwarder {
    /// Forwarder name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Forward one batch
    ///
    /// Returns the records as persisted downstream, in submission order.
    ///
    /// # Errors
    /// `ContractError::Transport` when the batch was not accepted
    async fn forward(
        &self,
        batch: &[ClassifiedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError>;
}
