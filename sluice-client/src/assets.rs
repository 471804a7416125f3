//! Asset declaration endpoints

use crate::GraphClient;
use crate::error::Result;
use sluice_core::domain::asset::AssetSpec;
use sluice_core::dto::asset::{AssetsRegistered, RegisterAssets};

impl GraphClient {
    /// Declare assets in the graph
    ///
    /// Registration is idempotent on the graph side: re-declaring an asset
    /// replaces its spec.
    ///
    /// # Returns
    /// The number of assets the graph accepted
    pub async fn register_assets(&self, assets: &[AssetSpec]) -> Result<usize> {
        let req = RegisterAssets {
            assets: assets.to_vec(),
        };
        let response = self
            .client
            .post(self.url("/api/assets"))
            .json(&req)
            .send()
            .await?;

        let registered: AssetsRegistered = self.handle_response(response).await?;
        Ok(registered.registered)
    }

    /// List every asset declared in the graph
    pub async fn list_assets(&self) -> Result<Vec<AssetSpec>> {
        let response = self.client.get(self.url("/api/assets")).send().await?;

        self.handle_response(response).await
    }
}
