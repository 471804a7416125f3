//! Run log endpoints

use crate::GraphClient;
use crate::error::Result;
use sluice_core::dto::run::{BatchAccepted, MaterializationBatch};

impl GraphClient {
    /// Submit the materializations of one run to the graph's run log
    ///
    /// # Returns
    /// The number of records the graph accepted
    pub async fn submit_materializations(&self, batch: &MaterializationBatch) -> Result<usize> {
        let url = self.url(&format!("/api/runs/{}/materializations", batch.run_id));
        let response = self.client.post(&url).json(batch).send().await?;

        let accepted: BatchAccepted = self.handle_response(response).await?;
        Ok(accepted.accepted)
    }
}
