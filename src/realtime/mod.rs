//! Kiosk display relay.
//!
//! One broadcast room per business slug. Publishing reaches whoever is
//! subscribed at that moment; there is no replay, and a receiver that falls
//! behind skips straight to the newest snapshot.

use crate::models::QueueSnapshot;
use actix_web::web::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

/// Per-room buffer. Displays only care about the latest state.
const ROOM_CAPACITY: usize = 16;

pub const QUEUE_UPDATE_EVENT: &str = "queue_update";

#[derive(Clone, Default)]
pub struct DisplayHub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<Arc<QueueSnapshot>>>>>,
}

impl DisplayHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, slug: &str) -> broadcast::Receiver<Arc<QueueSnapshot>> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(slug.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Pushes a snapshot to the room and returns how many displays received it.
    /// Rooms left without listeners are dropped.
    pub async fn publish(&self, slug: &str, snapshot: QueueSnapshot) -> usize {
        let delivered = {
            let rooms = self.rooms.read().await;
            match rooms.get(slug) {
                Some(tx) => tx.send(Arc::new(snapshot)).unwrap_or(0),
                None => return 0,
            }
        };

        if delivered == 0 {
            let mut rooms = self.rooms.write().await;
            if rooms.get(slug).is_some_and(|tx| tx.receiver_count() == 0) {
                rooms.remove(slug);
                log::debug!("Display room {} closed", slug);
            }
        } else {
            log::debug!("Queue update for {} pushed to {} display(s)", slug, delivered);
        }

        delivered
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

/// One Server-Sent-Events frame carrying a snapshot.
pub fn sse_frame(snapshot: &QueueSnapshot) -> Bytes {
    let data = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    Bytes::from(format!("event: {QUEUE_UPDATE_EVENT}\ndata: {data}\n\n"))
}

/// SSE body: the current snapshot first, then every published update.
pub fn snapshot_event_stream(
    initial: QueueSnapshot,
    rx: broadcast::Receiver<Arc<QueueSnapshot>>,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> + 'static {
    let first = tokio_stream::once(Ok(sse_frame(&initial)));
    let updates = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(snapshot) => Some(Ok(sse_frame(&snapshot))),
        // lagged: the next snapshot supersedes whatever was missed
        Err(_) => None,
    });
    first.chain(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueueEntry;

    fn snapshot(current: Option<i32>, waiting: &[i32]) -> QueueSnapshot {
        QueueSnapshot {
            current_called: current.map(|n| QueueEntry {
                number: n,
                name: "Tanpa nama".into(),
            }),
            waiting: waiting
                .iter()
                .map(|&n| QueueEntry {
                    number: n,
                    name: format!("Pelanggan {n}"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_room_subscribers_only() {
        let hub = DisplayHub::new();
        let mut warung = hub.subscribe("warung-budi").await;
        let mut salon = hub.subscribe("salon-sari").await;

        let delivered = hub.publish("warung-budi", snapshot(Some(1), &[2, 3])).await;
        assert_eq!(delivered, 1);

        let got = warung.recv().await.unwrap();
        assert_eq!(got.current_called.as_ref().unwrap().number, 1);
        assert!(salon.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let hub = DisplayHub::new();
        assert_eq!(hub.publish("nobody", snapshot(None, &[])).await, 0);

        let rx = hub.subscribe("warung-budi").await;
        drop(rx);
        assert_eq!(hub.room_count().await, 1);
        assert_eq!(hub.publish("warung-budi", snapshot(None, &[1])).await, 0);
        assert_eq!(hub.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_event_stream_starts_with_current_snapshot() {
        let hub = DisplayHub::new();
        let rx = hub.subscribe("warung-budi").await;
        let mut stream = Box::pin(snapshot_event_stream(snapshot(None, &[1]), rx));

        let first = stream.next().await.unwrap().unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();
        assert!(text.starts_with("event: queue_update\ndata: "));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains("\"current_called\":null"));

        hub.publish("warung-budi", snapshot(Some(1), &[])).await;
        let second = stream.next().await.unwrap().unwrap();
        let text = String::from_utf8(second.to_vec()).unwrap();
        assert!(text.contains("\"number\":1"));
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_to_newer_updates() {
        let hub = DisplayHub::new();
        let rx = hub.subscribe("warung-budi").await;
        let mut stream = Box::pin(snapshot_event_stream(snapshot(None, &[]), rx));
        stream.next().await.unwrap().unwrap();

        for n in 0..(ROOM_CAPACITY as i32 + 5) {
            hub.publish("warung-budi", snapshot(Some(n), &[])).await;
        }

        // the oldest updates were overwritten; the stream resumes without an error item
        let next = stream.next().await.unwrap().unwrap();
        let text = String::from_utf8(next.to_vec()).unwrap();
        assert!(text.contains("\"number\":5"));
    }
}
