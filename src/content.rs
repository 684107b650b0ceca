//! Content-addressed attachment cache.
//!
//! Each magnet maps to one watch channel holding the fetch state. The entry
//! is created in the `InProgress` state before the fetch is spawned, under the
//! map's entry lock, so concurrent requests for the same address join the
//! fetch already in flight instead of starting their own. Failed entries are
//! kept until the next request, which starts a fresh attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::watch;

use crate::store::traits::MediaStore;
use crate::types::events::{ContentFailed, ContentReady, EventBus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("fetching {magnet} failed: {reason}")]
    Fetch { magnet: String, reason: String },
}

/// Image formats recognized from their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Unknown,
}

impl MediaType {
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            MediaType::Png
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            MediaType::Jpeg
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            MediaType::Gif
        } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            MediaType::Webp
        } else {
            MediaType::Unknown
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
            MediaType::Unknown => "application/octet-stream",
        }
    }
}

/// Fetched attachment, ready for display. Cloning shares the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHandle {
    magnet: String,
    uri: String,
    media_type: MediaType,
    data: Bytes,
}

impl ContentHandle {
    fn new(magnet: String, seq: u64, data: Bytes) -> Self {
        Self {
            uri: format!("blob:chat-client/{seq}"),
            media_type: MediaType::sniff(&data),
            magnet,
            data,
        }
    }

    pub fn magnet(&self) -> &str {
        &self.magnet
    }

    /// Session-local URI, unique per fetched address.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

#[derive(Debug, Clone)]
enum FetchState {
    InProgress,
    Ready(ContentHandle),
    Failed(ContentError),
}

impl FetchState {
    fn outcome(&self, magnet: &str) -> Result<ContentHandle, ContentError> {
        match self {
            FetchState::Ready(handle) => Ok(handle.clone()),
            FetchState::Failed(e) => Err(e.clone()),
            FetchState::InProgress => Err(ContentError::Fetch {
                magnet: magnet.to_string(),
                reason: "fetch abandoned".into(),
            }),
        }
    }
}

type ContentEntries = DashMap<String, watch::Sender<FetchState>>;

pub struct ContentCache {
    media: Arc<dyn MediaStore>,
    events: Arc<EventBus>,
    entries: Arc<ContentEntries>,
    next_seq: Arc<AtomicU64>,
}

impl ContentCache {
    pub fn new(media: Arc<dyn MediaStore>, events: Arc<EventBus>) -> Self {
        Self {
            media,
            events,
            entries: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Fetches `magnet` once and shares the result with every caller that
    /// asks while the fetch is in flight or after it succeeded.
    pub async fn get_or_fetch(&self, magnet: &str) -> Result<ContentHandle, ContentError> {
        let mut rx = self.join_or_start(magnet);
        match rx
            .wait_for(|state| !matches!(state, FetchState::InProgress))
            .await
        {
            Ok(state) => state.outcome(magnet),
            Err(_) => FetchState::InProgress.outcome(magnet),
        }
    }

    /// Starts fetches for every address not already cached, without waiting.
    pub fn prefetch<I, S>(&self, magnets: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for magnet in magnets {
            self.join_or_start(magnet.as_ref());
        }
    }

    /// The handle for `magnet` if its fetch already succeeded.
    pub fn peek(&self, magnet: &str) -> Option<ContentHandle> {
        let entry = self.entries.get(magnet)?;
        match &*entry.borrow() {
            FetchState::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn is_fetching(&self, magnet: &str) -> bool {
        self.entries
            .get(magnet)
            .is_some_and(|entry| matches!(*entry.borrow(), FetchState::InProgress))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops settled entries. Fetches still in flight stay, so their waiters
    /// settle and the address is not downloaded twice.
    pub fn clear(&self) {
        self.entries
            .retain(|_, tx| matches!(*tx.borrow(), FetchState::InProgress));
    }

    /// Subscribes to the entry for `magnet`, marking it in progress and
    /// spawning a fetch when it is new or its last attempt failed.
    fn join_or_start(&self, magnet: &str) -> watch::Receiver<FetchState> {
        let (rx, start) = match self.entries.entry(magnet.to_string()) {
            Entry::Occupied(entry) => {
                let tx = entry.get();
                let retry = matches!(*tx.borrow(), FetchState::Failed(_));
                if retry {
                    tx.send_replace(FetchState::InProgress);
                }
                (tx.subscribe(), retry)
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(FetchState::InProgress);
                slot.insert(tx);
                (rx, true)
            }
        };
        if start {
            self.spawn_fetch(magnet.to_string());
        }
        rx
    }

    fn spawn_fetch(&self, magnet: String) {
        let media = self.media.clone();
        let events = self.events.clone();
        let entries = self.entries.clone();
        let seq = self.next_seq.clone();

        debug!("Downloading content {magnet}");
        tokio::spawn(async move {
            let state = match media.fetch(&magnet).await {
                Ok(data) => {
                    let handle =
                        ContentHandle::new(magnet.clone(), seq.fetch_add(1, Ordering::SeqCst), data);
                    let _ = events.content_ready.send(Arc::new(ContentReady {
                        handle: handle.clone(),
                    }));
                    FetchState::Ready(handle)
                }
                Err(e) => {
                    warn!("Failed to download content {magnet}: {e}");
                    let _ = events.content_failed.send(Arc::new(ContentFailed {
                        magnet: magnet.clone(),
                        reason: e.to_string(),
                    }));
                    FetchState::Failed(ContentError::Fetch {
                        magnet: magnet.clone(),
                        reason: e.to_string(),
                    })
                }
            };

            // The entry is gone if the cache was cleared mid-fetch.
            if let Some(tx) = entries.get(&magnet) {
                tx.send_replace(state);
            }
        });
    }
}
