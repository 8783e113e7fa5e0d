//! RecordStore trait - durable storage interface

use crate::{ContractError, PersistedRecord, ProcessedReading};

/// Durable record storage
///
/// `insert_batch` is all-or-nothing: either every record of the batch is committed
/// and returned with its id (in input order), or nothing is stored.
#[trait_variant::make(RecordStore: Send)]
pub trait LocalRecordStore {
    /// Insert one batch inside a single transaction
    ///
    /// # Errors
    /// `ContractError::Persist` after the transaction rolled back
    async fn insert_batch(
        &self,
        batch: &[ProcessedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError>;

    /// All records, ordered by id
    async fn list(&self) -> Result<Vec<PersistedRecord>, ContractError>;

    /// One record by id
    async fn get(&self, id: i64) -> Result<PersistedRecord, ContractError>;

    /// Replace the contents of an existing record
    async fn update(
        &self,
        id: i64,
        reading: &ProcessedReading,
    ) -> Result<PersistedRecord, ContractError>;

    /// Delete a record, returning what was stored
    async fn delete(&self, id: i64) -> Result<PersistedRecord, ContractError>;

    /// Number of stored records
    async fn count(&self) -> Result<u64, ContractError>;
}
