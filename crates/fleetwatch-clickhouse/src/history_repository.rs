use async_trait::async_trait;
use fleetwatch_domain::{DomainError, DomainResult, HistoryRecord, TelemetryHistoryStore};
use tracing::{debug, error};

use crate::client::ClickHouseClient;
use crate::models::TelemetryHistoryRow;

/// ClickHouse implementation of TelemetryHistoryStore.
///
/// Append-only: one insert per record, no retries here. Failures surface to
/// the consumer, which logs and moves on to the next message.
#[derive(Clone)]
pub struct ClickHouseHistoryRepository {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseHistoryRepository {
    pub fn new(client: ClickHouseClient, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl TelemetryHistoryStore for ClickHouseHistoryRepository {
    async fn append(&self, record: &HistoryRecord) -> DomainResult<()> {
        debug!(
            car_id = %record.car_id,
            table = %self.table,
            "Appending history record to ClickHouse"
        );

        let row = TelemetryHistoryRow::from(record);

        let mut insert = self
            .client
            .get_client()
            .insert::<TelemetryHistoryRow>(&self.table)
            .map_err(|e| {
                error!("Failed to create ClickHouse inserter: {}", e);
                DomainError::RepositoryError(e.into())
            })?;

        insert.write(&row).await.map_err(|e| {
            error!("Failed to write history row to ClickHouse: {}", e);
            DomainError::RepositoryError(e.into())
        })?;

        insert.end().await.map_err(|e| {
            error!("Failed to finalize ClickHouse insert: {}", e);
            DomainError::RepositoryError(e.into())
        })?;

        debug!(car_id = %record.car_id, "History record appended");
        Ok(())
    }
}
