// ── Reactive data store ──
//
// Single writer (the reconciler), many readers. The table lives in a
// `watch` channel so subscribers always see a fully merged version; the
// latest snapshot sits in an `ArcSwapOption`; deltas fan out over
// `broadcast`.

mod table;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{broadcast, watch};

use crate::model::ApplianceSnapshot;
use crate::stream::TableStream;

pub use table::{DeviceTable, SnapshotDelta};

const DELTA_CHANNEL_SIZE: usize = 64;

pub struct DataStore {
    table: watch::Sender<Arc<DeviceTable>>,
    snapshot: ArcSwapOption<ApplianceSnapshot>,
    deltas: broadcast::Sender<Arc<SnapshotDelta>>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        let (table, _) = watch::channel(Arc::new(DeviceTable::default()));
        let (deltas, _) = broadcast::channel(DELTA_CHANNEL_SIZE);
        Self {
            table,
            snapshot: ArcSwapOption::empty(),
            deltas,
        }
    }

    /// Current table (cheap `Arc` clone).
    pub fn table(&self) -> Arc<DeviceTable> {
        self.table.borrow().clone()
    }

    /// Latest snapshot, `None` before the first successful pass.
    pub fn snapshot(&self) -> Option<Arc<ApplianceSnapshot>> {
        self.snapshot.load_full()
    }

    pub fn subscribe_table(&self) -> watch::Receiver<Arc<DeviceTable>> {
        self.table.subscribe()
    }

    pub fn subscribe_deltas(&self) -> broadcast::Receiver<Arc<SnapshotDelta>> {
        self.deltas.subscribe()
    }

    pub fn stream(&self) -> TableStream {
        TableStream::new(self.subscribe_table())
    }

    /// Publish the outcome of a pass. The snapshot is swapped before the
    /// table so a table subscriber woken by the change reads the matching
    /// snapshot.
    pub(crate) fn publish(
        &self,
        table: DeviceTable,
        snapshot: ApplianceSnapshot,
        delta: SnapshotDelta,
    ) -> Arc<SnapshotDelta> {
        self.snapshot.store(Some(Arc::new(snapshot)));
        self.table.send_replace(Arc::new(table));
        let delta = Arc::new(delta);
        // No receivers is fine: deltas are advisory.
        let _ = self.deltas.send(Arc::clone(&delta));
        delta
    }
}
