//! Inbound message routing.
//!
//! The [`Dispatcher`] owns the pending-request table and the subscriber
//! registry of one connection. The connection's I/O task is the only caller
//! of [`Dispatcher::on_message`], so it is the only code that resolves
//! pending requests and the only code that invokes subscribers. Callers of
//! `send` only insert into the pending table.
//!
//! # Routing Rules
//!
//! | Inbound | Action |
//! |---------|--------|
//! | `id` matching a pending request | complete that request (result or [`Error::Protocol`]) |
//! | `method` (no matching `id`) | invoke subscribers of that method in registration order |
//! | neither | drop and log |

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SubscriptionId};
use crate::protocol::InboundMessage;

// ============================================================================
// Types
// ============================================================================

/// Notification subscriber callback.
///
/// Receives the notification's `params`. A panic inside the callback is
/// caught and logged; remaining subscribers still run.
pub type NotificationHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Receiving half of a pending request.
pub type PendingReceiver = oneshot::Receiver<Result<Value>>;

/// A request awaiting its response.
struct PendingRequest {
    /// Method name, for logging.
    method: String,
    /// Completion channel; consumed exactly once.
    tx: oneshot::Sender<Result<Value>>,
}

/// Pending requests plus the closed flag, guarded by one lock.
#[derive(Default)]
struct PendingTable {
    entries: FxHashMap<RequestId, PendingRequest>,
    closed: bool,
}

/// A registered notification subscriber.
struct Subscriber {
    id: SubscriptionId,
    once: bool,
    handler: NotificationHandler,
}

/// Method name to subscribers, in registration order.
type Registry = FxHashMap<String, Vec<Subscriber>>;

// ============================================================================
// Subscription
// ============================================================================

/// Handle returned by [`Dispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: SubscriptionId,
    method: String,
}

impl Subscription {
    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the notification method this subscription listens to.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of routing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A pending request was completed.
    Resolved(RequestId),
    /// A notification was delivered to this many subscribers.
    Notified {
        /// Notification method.
        method: String,
        /// Number of subscribers invoked.
        subscribers: usize,
    },
    /// Neither a pending response nor a notification.
    Dropped,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes inbound messages to pending requests and subscribers.
#[derive(Default)]
pub struct Dispatcher {
    pending: Mutex<PendingTable>,
    subscribers: Mutex<Registry>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Dispatcher - Pending Requests
// ============================================================================

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending request and returns its completion receiver.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the dispatcher has been closed
    /// - [`Error::Protocol`] if `id` is already pending
    pub fn register(&self, id: RequestId, method: &str) -> Result<PendingReceiver> {
        let (tx, rx) = oneshot::channel();
        let mut table = self.pending.lock();

        if table.closed {
            return Err(Error::ConnectionClosed);
        }
        if table.entries.contains_key(&id) {
            return Err(Error::protocol(format!("Request id {id} is already pending")));
        }

        table.entries.insert(
            id,
            PendingRequest {
                method: method.to_string(),
                tx,
            },
        );
        trace!(%id, method, "Request registered");
        Ok(rx)
    }

    /// Removes a pending request without completing it.
    ///
    /// Returns `true` if the request was still pending.
    pub fn forget(&self, id: RequestId) -> bool {
        self.pending.lock().entries.remove(&id).is_some()
    }

    /// Completes a pending request with an error.
    ///
    /// Returns `true` if the request was still pending.
    pub fn fail(&self, id: RequestId, error: Error) -> bool {
        let entry = self.pending.lock().entries.remove(&id);
        match entry {
            Some(pending) => {
                debug!(%id, method = %pending.method, error = %error, "Request failed locally");
                let _ = pending.tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().entries.len()
    }

    /// Returns `true` once [`Dispatcher::close`] has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }
}

// ============================================================================
// Dispatcher - Subscribers
// ============================================================================

impl Dispatcher {
    /// Registers a subscriber for notifications named `method`.
    ///
    /// With `once`, the subscriber is removed before its first invocation.
    pub fn subscribe(&self, method: &str, handler: NotificationHandler, once: bool) -> Subscription {
        let id = SubscriptionId::next();
        self.subscribers
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(Subscriber { id, once, handler });

        trace!(%id, method, once, "Subscriber registered");
        Subscription {
            id,
            method: method.to_string(),
        }
    }

    /// Removes a subscriber.
    ///
    /// Returns `true` if it was still registered.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut registry = self.subscribers.lock();
        let Some(list) = registry.get_mut(&subscription.method) else {
            return false;
        };

        let before = list.len();
        list.retain(|subscriber| subscriber.id != subscription.id);
        let removed = list.len() != before;

        if list.is_empty() {
            registry.remove(&subscription.method);
        }
        removed
    }

    /// Returns the number of subscribers for `method`.
    #[must_use]
    pub fn subscriber_count(&self, method: &str) -> usize {
        self.subscribers.lock().get(method).map_or(0, Vec::len)
    }
}

// ============================================================================
// Dispatcher - Routing
// ============================================================================

impl Dispatcher {
    /// Routes one decoded inbound message.
    pub fn on_message(&self, message: InboundMessage) -> Dispatch {
        if let Some(id) = message.id {
            let pending = self.pending.lock().entries.remove(&id);
            if let Some(pending) = pending {
                trace!(%id, method = %pending.method, "Response received");
                let _ = pending.tx.send(message.into_outcome());
                return Dispatch::Resolved(id);
            }
            if message.method.is_none() {
                warn!(%id, "Response for unknown request");
                return Dispatch::Dropped;
            }
        }

        let session_id = message.session_id.clone();
        match message.into_notification() {
            Some(notification) => {
                trace!(method = %notification.method, session_id = ?session_id, "Notification received");
                let subscribers = self.notify(&notification.method, &notification.params);
                Dispatch::Notified {
                    method: notification.method,
                    subscribers,
                }
            }
            None => {
                debug!("Dropping message with neither known id nor method");
                Dispatch::Dropped
            }
        }
    }

    /// Invokes the subscribers of `method`; returns how many ran.
    fn notify(&self, method: &str, params: &Value) -> usize {
        // Snapshot under the lock, invoke without it: handlers may subscribe.
        let handlers: Vec<NotificationHandler> = {
            let mut registry = self.subscribers.lock();
            let Some(list) = registry.get_mut(method) else {
                return 0;
            };

            let handlers = list.iter().map(|s| Arc::clone(&s.handler)).collect();
            list.retain(|subscriber| !subscriber.once);
            if list.is_empty() {
                registry.remove(method);
            }
            handlers
        };

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(params))).is_err() {
                warn!(method, "Notification subscriber panicked");
            }
        }
        handlers.len()
    }
}

// ============================================================================
// Dispatcher - Shutdown
// ============================================================================

impl Dispatcher {
    /// Rejects every pending request with [`Error::ConnectionClosed`] and
    /// clears the registry.
    ///
    /// Later registrations fail. Idempotent; returns the number of requests
    /// rejected by this call.
    pub fn close(&self) -> usize {
        let drained: Vec<(RequestId, PendingRequest)> = {
            let mut table = self.pending.lock();
            table.closed = true;
            table.entries.drain().collect()
        };

        let count = drained.len();
        for (id, pending) in drained {
            trace!(%id, method = %pending.method, "Rejecting pending request");
            let _ = pending.tx.send(Err(Error::ConnectionClosed));
        }

        self.subscribers.lock().clear();

        if count > 0 {
            debug!(count, "Failed pending requests on close");
        }
        count
    }
}

// ============================================================================
// Tests
// ============================================================================
