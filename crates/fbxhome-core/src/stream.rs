// ── Table subscription ──

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::DeviceTable;

/// Subscription handle on the device table.
///
/// `current()` reads without waiting; `changed()` waits for the next
/// published pass; `into_stream()` adapts it for `StreamExt` consumers.
pub struct TableStream {
    receiver: watch::Receiver<Arc<DeviceTable>>,
}

impl TableStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<DeviceTable>>) -> Self {
        Self { receiver }
    }

    pub fn current(&self) -> Arc<DeviceTable> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next table. Returns `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Arc<DeviceTable>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn into_stream(self) -> TableWatchStream {
        TableWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of tables, starting with the current one.
pub struct TableWatchStream {
    inner: WatchStream<Arc<DeviceTable>>,
}

impl Stream for TableWatchStream {
    type Item = Arc<DeviceTable>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
