// Storage endpoints: disks with their partitions, and RAID arrays.

use crate::client::FreeboxClient;
use crate::error::Error;
use crate::models::{Disk, RaidArray};

impl FreeboxClient {
    /// Disks attached to the appliance, internal and external.
    ///
    /// `GET /api/v6/storage/disk/`
    pub async fn storage_disks(&self) -> Result<Vec<Disk>, Error> {
        self.get_list("storage/disk/").await
    }

    /// RAID arrays.
    ///
    /// `GET /api/v6/storage/raid/`
    ///
    /// Models without RAID support answer with an API error.
    pub async fn storage_raids(&self) -> Result<Vec<RaidArray>, Error> {
        self.get_list("storage/raid/").await
    }
}
