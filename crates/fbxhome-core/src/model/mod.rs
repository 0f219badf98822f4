// ── Domain model ──
//
// Canonical types the reconciler produces and consumers read. Wire types
// from fbxhome-api never leak past `convert`.

pub mod device;
pub mod entity_id;
pub mod home;
pub mod snapshot;

pub use device::{DeviceDetails, DeviceKind, DeviceRecord, HostDetails, NodeDetails, WifiLink};
pub use entity_id::{DeviceKey, MacAddress};
pub use home::{AlarmState, HomeCategory, NodeState};
pub use snapshot::{
    ApplianceSnapshot, AvailabilityChange, CallRecord, ConnectionInfo, DiskInfo, ParentDevice,
    PartitionInfo, RaidInfo, Sensor, Subsystem, SystemInfo,
};
