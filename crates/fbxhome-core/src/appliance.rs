// ── Appliance capability traits ──
//
// The session manager, reconciler and dispatcher talk to the appliance
// only through these traits. `FreeboxClient` / `RemoteControlClient` are
// the production implementations; tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use fbxhome_api::models::{
    CallEntry, ConnectionStatus, Disk, EndpointValue, HomeNode, LanHost, RaidArray, SystemConfig,
    WifiGlobalConfig, WifiStation,
};
use fbxhome_api::{ChallengeSigner, Error, FreeboxClient, RemoteControlClient};
use futures_util::future::try_join_all;
use tracing::debug;

use crate::config::ApplianceConfig;
use crate::error::CoreError;

/// An open, authenticated appliance session.
#[async_trait]
pub trait Appliance: Send + Sync {
    async fn system_config(&self) -> Result<SystemConfig, Error>;
    async fn connection_status(&self) -> Result<ConnectionStatus, Error>;
    async fn lan_hosts(&self) -> Result<Vec<LanHost>, Error>;
    /// Stations across every access point.
    async fn wifi_stations(&self) -> Result<Vec<WifiStation>, Error>;
    async fn wifi_global_config(&self) -> Result<WifiGlobalConfig, Error>;
    async fn set_wifi_enabled(&self, enabled: bool) -> Result<WifiGlobalConfig, Error>;
    async fn storage_disks(&self) -> Result<Vec<Disk>, Error>;
    async fn storage_raids(&self) -> Result<Vec<RaidArray>, Error>;
    async fn call_log(&self) -> Result<Vec<CallEntry>, Error>;
    async fn home_nodes(&self) -> Result<Vec<HomeNode>, Error>;
    async fn home_endpoint_value(&self, node_id: u64, endpoint_id: u64) -> Result<EndpointValue, Error>;
    async fn reboot(&self) -> Result<(), Error>;
    async fn close(&self) -> Result<(), Error>;
}

/// Opens appliance sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn Appliance>, Error>;
}

/// Delivers player key presses.
#[async_trait]
pub trait RemoteKeySender: Send + Sync {
    async fn send_key(&self, key: &str, long_press: bool) -> Result<(), Error>;
}

// ── Production implementations ──────────────────────────────────────

#[async_trait]
impl Appliance for FreeboxClient {
    async fn system_config(&self) -> Result<SystemConfig, Error> {
        FreeboxClient::system_config(self).await
    }

    async fn connection_status(&self) -> Result<ConnectionStatus, Error> {
        FreeboxClient::connection_status(self).await
    }

    async fn lan_hosts(&self) -> Result<Vec<LanHost>, Error> {
        FreeboxClient::lan_hosts(self).await
    }

    async fn wifi_stations(&self) -> Result<Vec<WifiStation>, Error> {
        let aps = self.wifi_access_points().await?;
        let per_ap = try_join_all(aps.iter().map(|ap| FreeboxClient::wifi_stations(self, ap.id))).await?;
        Ok(per_ap.into_iter().flatten().collect())
    }

    async fn wifi_global_config(&self) -> Result<WifiGlobalConfig, Error> {
        FreeboxClient::wifi_global_config(self).await
    }

    async fn set_wifi_enabled(&self, enabled: bool) -> Result<WifiGlobalConfig, Error> {
        FreeboxClient::set_wifi_enabled(self, enabled).await
    }

    async fn storage_disks(&self) -> Result<Vec<Disk>, Error> {
        FreeboxClient::storage_disks(self).await
    }

    async fn storage_raids(&self) -> Result<Vec<RaidArray>, Error> {
        FreeboxClient::storage_raids(self).await
    }

    async fn call_log(&self) -> Result<Vec<CallEntry>, Error> {
        FreeboxClient::call_log(self).await
    }

    async fn home_nodes(&self) -> Result<Vec<HomeNode>, Error> {
        FreeboxClient::home_nodes(self).await
    }

    async fn home_endpoint_value(&self, node_id: u64, endpoint_id: u64) -> Result<EndpointValue, Error> {
        FreeboxClient::home_endpoint_value(self, node_id, endpoint_id).await
    }

    async fn reboot(&self) -> Result<(), Error> {
        FreeboxClient::reboot(self).await
    }

    async fn close(&self) -> Result<(), Error> {
        FreeboxClient::close(self).await
    }
}

#[async_trait]
impl RemoteKeySender for RemoteControlClient {
    async fn send_key(&self, key: &str, long_press: bool) -> Result<(), Error> {
        RemoteControlClient::send_key(self, key, long_press).await
    }
}

/// Opens sessions over HTTPS with a registered application identity.
pub struct HttpConnector {
    config: ApplianceConfig,
    signer: Arc<dyn ChallengeSigner>,
}

impl HttpConnector {
    pub fn new(config: ApplianceConfig, signer: Arc<dyn ChallengeSigner>) -> Self {
        Self { config, signer }
    }

    /// Build the player remote client, if a player is configured.
    pub fn remote(config: &ApplianceConfig) -> Result<Option<Arc<dyn RemoteKeySender>>, CoreError> {
        let Some(remote) = &config.remote else {
            return Ok(None);
        };
        let client = RemoteControlClient::new(&remote.host, remote.code.clone())?;
        Ok(Some(Arc::new(client)))
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self) -> Result<Arc<dyn Appliance>, Error> {
        let base_url = FreeboxClient::endpoint_url(&self.config.host, self.config.port)?;
        debug!(url = %base_url, "opening appliance session");
        let client = FreeboxClient::new(base_url, &self.config.transport())?;
        client.open(&self.config.identity, self.signer.as_ref()).await?;
        Ok(Arc::new(client))
    }
}
