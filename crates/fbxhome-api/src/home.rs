// Home-automation endpoints: node listing and endpoint values.

use crate::client::FreeboxClient;
use crate::error::Error;
use crate::models::{EndpointValue, HomeNode};

impl FreeboxClient {
    /// All paired home-automation nodes with their listed endpoint values.
    ///
    /// `GET /api/v6/home/nodes`
    ///
    /// Fails with `Error::InsufficientRights` when the application was not
    /// granted home access.
    pub async fn home_nodes(&self) -> Result<Vec<HomeNode>, Error> {
        self.get_list("home/nodes").await
    }

    /// Current value of one node endpoint.
    ///
    /// `GET /api/v6/home/endpoints/{node_id}/{endpoint_id}`
    pub async fn home_endpoint_value(
        &self,
        node_id: u64,
        endpoint_id: u64,
    ) -> Result<EndpointValue, Error> {
        self.get(&format!("home/endpoints/{node_id}/{endpoint_id}"))
            .await
    }
}
