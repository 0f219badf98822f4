// ── Device registry seam ──
//
// Hosts decide where the parent device record lives (a home-automation
// platform's registry, a log line). The integration only registers it.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::model::ParentDevice;

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Register or update the appliance's parent device.
    async fn register_parent(&self, device: &ParentDevice) -> Result<(), CoreError>;
}

/// Keeps registrations in memory, latest last.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    devices: Mutex<Vec<ParentDevice>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn devices(&self) -> Vec<ParentDevice> {
        self.devices.lock().await.clone()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryRegistry {
    async fn register_parent(&self, device: &ParentDevice) -> Result<(), CoreError> {
        let mut devices = self.devices.lock().await;
        devices.retain(|d| d.identifier != device.identifier);
        devices.push(device.clone());
        Ok(())
    }
}
