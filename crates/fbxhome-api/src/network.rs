// LAN browser and Wi-Fi endpoints.

use serde_json::json;

use crate::client::FreeboxClient;
use crate::error::Error;
use crate::models::{LanHost, WifiAccessPoint, WifiGlobalConfig, WifiStation};

/// LAN browser interface holding the hosts seen on the home network.
pub const LAN_INTERFACE: &str = "pub";

/// API error code returned by the LAN browser in bridge mode.
pub const BRIDGE_MODE_CODE: &str = "nodev";

impl FreeboxClient {
    /// Hosts known to the LAN browser.
    ///
    /// `GET /api/v6/lan/browser/pub/`
    ///
    /// Fails with `Error::Api { code: "nodev", .. }` when the appliance runs
    /// in bridge mode.
    pub async fn lan_hosts(&self) -> Result<Vec<LanHost>, Error> {
        self.get_list(&format!("lan/browser/{LAN_INTERFACE}/")).await
    }

    /// Wi-Fi access points (one per radio).
    ///
    /// `GET /api/v6/wifi/ap/`
    pub async fn wifi_access_points(&self) -> Result<Vec<WifiAccessPoint>, Error> {
        self.get_list("wifi/ap/").await
    }

    /// Stations associated with one access point.
    ///
    /// `GET /api/v6/wifi/ap/{ap_id}/stations/`
    pub async fn wifi_stations(&self, ap_id: u64) -> Result<Vec<WifiStation>, Error> {
        self.get_list(&format!("wifi/ap/{ap_id}/stations/")).await
    }

    /// Global Wi-Fi switch and MAC filter state.
    ///
    /// `GET /api/v6/wifi/config/`
    pub async fn wifi_global_config(&self) -> Result<WifiGlobalConfig, Error> {
        self.get("wifi/config/").await
    }

    /// Turn every radio on or off. Returns the updated configuration.
    ///
    /// `PUT /api/v6/wifi/config/`
    pub async fn set_wifi_enabled(&self, enabled: bool) -> Result<WifiGlobalConfig, Error> {
        self.put("wifi/config/", &json!({ "enabled": enabled })).await
    }
}
