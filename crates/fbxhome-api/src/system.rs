// System endpoints: config, connection status, reboot.

use tracing::debug;

use crate::client::FreeboxClient;
use crate::error::Error;
use crate::models::{ConnectionStatus, SystemConfig};

impl FreeboxClient {
    /// Hardware identity, firmware and sensors.
    ///
    /// `GET /api/v6/system/`
    pub async fn system_config(&self) -> Result<SystemConfig, Error> {
        self.get("system/").await
    }

    /// WAN link state and current rates.
    ///
    /// `GET /api/v6/connection/`
    pub async fn connection_status(&self) -> Result<ConnectionStatus, Error> {
        self.get("connection/").await
    }

    /// Reboot the appliance. Requires the `settings` permission.
    ///
    /// `POST /api/v6/system/reboot/`
    pub async fn reboot(&self) -> Result<(), Error> {
        debug!("requesting appliance reboot");
        self.post_empty("system/reboot/").await
    }
}
