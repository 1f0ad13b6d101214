//! Tag pairing coordinator.
//!
//! Reconciles reader scans with bind requests. The coordinator owns three
//! single-value slots:
//!
//! - the pending bind (`AwaitingScanForItem`), held together with the
//!   oneshot sender of the parked caller
//! - the item marker (`ItemFoundAwaitingHanger`)
//! - the hanger marker (`HangerFoundAwaitingItem`)
//!
//! Operations are serialized by `serial`, an async lock held for the whole
//! operation including store calls. The slots themselves sit behind a plain
//! mutex that is only taken for short, non-awaiting sections, which lets an
//! abandoned [`BindHandle`] clear its slot from `Drop`.

use crate::domain::model::{BindResult, PairingSnapshot, ScanEvent, ScanOutcome};
use crate::domain::ports::EntityStore;
use crate::utils::error::{PairingError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

type BindReply = Result<BindResult>;

struct PendingBind {
    request_id: u64,
    item_id: String,
    responder: oneshot::Sender<BindReply>,
}

#[derive(Default)]
struct PairingState {
    pending: Option<PendingBind>,
    item_awaiting_hanger: Option<String>,
    hanger_awaiting_item: Option<String>,
}

impl PairingState {
    fn snapshot(&self) -> PairingSnapshot {
        PairingSnapshot {
            pending_item_id: self.pending.as_ref().map(|p| p.item_id.clone()),
            item_awaiting_hanger: self.item_awaiting_hanger.clone(),
            hanger_awaiting_item: self.hanger_awaiting_item.clone(),
        }
    }
}

fn lock(state: &Mutex<PairingState>) -> MutexGuard<'_, PairingState> {
    // The slots stay consistent even if a holder panicked: every section
    // below writes whole values.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PairingCoordinator<S: EntityStore> {
    store: S,
    state: Arc<Mutex<PairingState>>,
    serial: tokio::sync::Mutex<()>,
    next_request: AtomicU64,
    next_scan: AtomicU64,
    closed: AtomicBool,
}

impl<S: EntityStore> PairingCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(PairingState::default())),
            serial: tokio::sync::Mutex::new(()),
            next_request: AtomicU64::new(0),
            next_scan: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> PairingSnapshot {
        lock(&self.state).snapshot()
    }

    /// Ask for the next scanned tag to be bound to `item_id` and wait for it.
    pub async fn request_bind(&self, item_id: &str) -> Result<BindResult> {
        self.register_bind(item_id).await?.wait().await
    }

    /// Park a bind request for `item_id` and return its wait handle.
    ///
    /// A previously parked request is resolved with `Superseded`. Once the
    /// coordinator is closed every new request is answered with `Cancelled`.
    pub async fn register_bind(&self, item_id: &str) -> Result<BindHandle> {
        let _serial = self.serial.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(PairingError::Cancelled {
                item_id: item_id.to_string(),
            });
        }

        if self.store.get_item(item_id).await?.is_none() {
            return Err(PairingError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }

        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;
        let (responder, receiver) = oneshot::channel();
        let replaced = lock(&self.state).pending.replace(PendingBind {
            request_id,
            item_id: item_id.to_string(),
            responder,
        });

        if let Some(old) = replaced {
            tracing::warn!(
                "Bind request for item {} superseded by request for item {}",
                old.item_id,
                item_id
            );
            let item_id = old.item_id;
            let _ = old.responder.send(Err(PairingError::Superseded { item_id }));
        }

        tracing::info!("Waiting for a scan to bind to item {}", item_id);
        Ok(BindHandle {
            request_id,
            item_id: item_id.to_string(),
            receiver,
            state: Arc::downgrade(&self.state),
        })
    }

    /// Apply one reader scan.
    ///
    /// Decision order: pending bind, then item lookup, then hanger lookup.
    /// Store writes happen before any slot changes, so a failed write leaves
    /// the coordinator exactly as it was.
    pub async fn report_scan(&self, raw_tag: &str) -> Result<ScanOutcome> {
        let _serial = self.serial.lock().await;

        let event = ScanEvent::accept(raw_tag, &self.next_scan)?;
        tracing::debug!(
            "Scan #{} tag={} received_at={}",
            event.sequence,
            event.tag_id,
            event.received_at.to_rfc3339()
        );

        let pending = lock(&self.state)
            .pending
            .as_ref()
            .map(|p| (p.request_id, p.item_id.clone()));
        if let Some((request_id, item_id)) = pending {
            match self
                .complete_tag_binding(request_id, item_id, &event.tag_id)
                .await
            {
                // The item was deleted while parked: release the caller and
                // handle the scan as if nobody was waiting.
                Err(PairingError::ItemNotFound { item_id }) => {
                    self.drop_vanished_bind(request_id, item_id)
                }
                other => return other,
            }
        }

        if let Some(item) = self.store.find_item_by_tag(&event.tag_id).await? {
            let hanger = lock(&self.state).hanger_awaiting_item.clone();
            return match hanger {
                Some(hanger_id) => self.complete_hanger_pairing(item.id, hanger_id).await,
                None => {
                    lock(&self.state).item_awaiting_hanger = Some(item.id.clone());
                    tracing::info!("Item {} scanned, waiting for its hanger", item.id);
                    Ok(ScanOutcome::WaitingForHanger { item_id: item.id })
                }
            };
        }

        if let Some(hanger) = self.store.find_hanger_by_tag(&event.tag_id).await? {
            let item = lock(&self.state).item_awaiting_hanger.clone();
            if let Some(item_id) = item {
                match self
                    .complete_hanger_pairing(item_id, hanger.id.clone())
                    .await
                {
                    Err(PairingError::ItemNotFound { item_id }) => {
                        tracing::warn!("Item {} awaiting a hanger no longer exists", item_id);
                        lock(&self.state).item_awaiting_hanger = None;
                    }
                    other => return other,
                }
            }

            lock(&self.state).hanger_awaiting_item = Some(hanger.id.clone());
            tracing::info!("Hanger {} scanned, waiting for an item", hanger.id);
            return Ok(ScanOutcome::WaitingForItem {
                hanger_id: hanger.id,
            });
        }

        tracing::info!("Tag {} matches no item or hanger", event.tag_id);
        Ok(ScanOutcome::Unrecognized {
            tag_id: event.tag_id,
        })
    }

    /// Abort any in-flight pairing and return what was cleared.
    ///
    /// A parked bind caller is resolved with `Cancelled`.
    pub async fn reset(&self) -> PairingSnapshot {
        let _serial = self.serial.lock().await;

        let (cleared, pending) = {
            let mut state = lock(&self.state);
            let cleared = state.snapshot();
            state.item_awaiting_hanger = None;
            state.hanger_awaiting_item = None;
            (cleared, state.pending.take())
        };

        if let Some(pending) = pending {
            let item_id = pending.item_id;
            let _ = pending
                .responder
                .send(Err(PairingError::Cancelled { item_id }));
        }

        if !cleared.is_idle() {
            tracing::info!("Pairing state reset: {:?}", cleared);
        }
        cleared
    }

    /// Reset and refuse further bind requests.
    ///
    /// Scans keep working so a reader can finish its current exchange.
    pub async fn close(&self) -> PairingSnapshot {
        self.closed.store(true, Ordering::SeqCst);
        self.reset().await
    }

    fn drop_vanished_bind(&self, request_id: u64, item_id: String) {
        let pending = {
            let mut state = lock(&self.state);
            let still_parked = state
                .pending
                .as_ref()
                .is_some_and(|p| p.request_id == request_id);
            if still_parked {
                state.pending.take()
            } else {
                None
            }
        };

        tracing::warn!("Item {} was deleted while waiting for a tag", item_id);
        if let Some(pending) = pending {
            let _ = pending
                .responder
                .send(Err(PairingError::ItemNotFound { item_id }));
        }
    }

    async fn complete_tag_binding(
        &self,
        request_id: u64,
        item_id: String,
        tag_id: &str,
    ) -> Result<ScanOutcome> {
        self.store.set_item_tag(&item_id, tag_id).await?;

        let result = BindResult {
            tag_id: tag_id.to_string(),
            item_id,
        };

        let waiter = {
            let mut state = lock(&self.state);
            let still_parked = state
                .pending
                .as_ref()
                .is_some_and(|p| p.request_id == request_id);
            if still_parked {
                state.pending.take()
            } else {
                None
            }
        };
        match waiter {
            Some(waiter) => {
                if waiter.responder.send(Ok(result.clone())).is_err() {
                    tracing::debug!("Bind caller for item {} already gone", result.item_id);
                }
            }
            None => tracing::warn!(
                "Bind caller for item {} left while tag {} was being stored",
                result.item_id,
                result.tag_id
            ),
        }

        tracing::info!("Tag {} bound to item {}", result.tag_id, result.item_id);
        Ok(ScanOutcome::tag_bound(result.tag_id, result.item_id))
    }

    async fn complete_hanger_pairing(
        &self,
        item_id: String,
        hanger_id: String,
    ) -> Result<ScanOutcome> {
        self.store.set_item_hanger(&item_id, &hanger_id).await?;

        {
            let mut state = lock(&self.state);
            state.item_awaiting_hanger = None;
            state.hanger_awaiting_item = None;
        }

        tracing::info!("Item {} placed on hanger {}", item_id, hanger_id);
        Ok(ScanOutcome::hanger_bound(item_id, hanger_id))
    }
}

/// Wait handle for one parked bind request.
///
/// Dropping an unresolved handle cancels the request: the pending slot is
/// cleared if it still belongs to this handle, and left alone if a newer
/// request already replaced it.
#[must_use = "dropping a BindHandle cancels the bind request"]
#[derive(Debug)]
pub struct BindHandle {
    request_id: u64,
    item_id: String,
    receiver: oneshot::Receiver<BindReply>,
    state: Weak<Mutex<PairingState>>,
}

impl BindHandle {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub async fn wait(mut self) -> Result<BindResult> {
        match (&mut self.receiver).await {
            Ok(reply) => reply,
            // Sender dropped without a reply: the coordinator went away.
            Err(_) => Err(PairingError::Cancelled {
                item_id: self.item_id.clone(),
            }),
        }
    }

    pub async fn wait_timeout(self, timeout: Duration) -> Result<BindResult> {
        let item_id = self.item_id.clone();
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(reply) => reply,
            Err(_) => {
                tracing::info!("Bind request for item {} timed out", item_id);
                Err(PairingError::TimedOut { item_id })
            }
        }
    }
}

impl Drop for BindHandle {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        if state
            .pending
            .as_ref()
            .is_some_and(|p| p.request_id == self.request_id)
        {
            state.pending = None;
            tracing::debug!("Bind request for item {} abandoned", self.item_id);
        }
    }
}
