//! Concurrent session storage with per-session locking.
//!
//! [`SessionRepository`] stores every session in a `HashMap` where each
//! entry is individually protected by a [`tokio::sync::RwLock`]. Reads of
//! one session run concurrently; writes to one session are serialized;
//! different sessions never contend beyond the brief outer-map lock.
//!
//! Two secondary indexes are kept alongside: `order_id → session` for
//! get-or-create, and `part_id → session` so a part can be paid knowing
//! only its id. Creation is serialized per order, so opening sessions for
//! different orders never waits on another order's journal write.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::session::SessionSummary;
use super::{PartId, PaymentSession, SessionId, SessionStatus};
use crate::error::GatewayError;

/// Shared handle to one session behind its own lock.
pub type SessionHandle = Arc<RwLock<PaymentSession>>;

/// Central store for all payment sessions.
#[derive(Debug, Default)]
pub struct SessionRepository {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    by_order: RwLock<HashMap<String, SessionId>>,
    parts: RwLock<HashMap<PartId, SessionId>>,
    creating: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes session creation for one order, so that two concurrent
    /// requests for the same order cannot both create a session.
    ///
    /// Locks of orders nobody is creating are dropped on the next call.
    pub async fn creation_guard(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.creating.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(order_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Inserts a session and indexes its order and active split parts.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the session id or its
    /// order already has a session.
    pub async fn insert(&self, session: PaymentSession) -> Result<SessionHandle, GatewayError> {
        let session_id = session.id;
        let order_id = session.order_id.clone();
        let part_ids = session
            .active_split
            .as_ref()
            .map(super::Split::part_ids)
            .unwrap_or_default();

        let mut map = self.sessions.write().await;
        let mut orders = self.by_order.write().await;
        if map.contains_key(&session_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "session {session_id} already exists"
            )));
        }
        if orders.contains_key(&order_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "order {order_id} already has a session"
            )));
        }
        let handle = Arc::new(RwLock::new(session));
        map.insert(session_id, Arc::clone(&handle));
        orders.insert(order_id, session_id);
        drop(orders);
        drop(map);

        self.index_parts(session_id, &part_ids).await;
        Ok(handle)
    }

    /// Returns the session behind its lock.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if no session has this id.
    pub async fn get(&self, session_id: SessionId) -> Result<SessionHandle, GatewayError> {
        let map = self.sessions.read().await;
        map.get(&session_id)
            .cloned()
            .ok_or(GatewayError::SessionNotFound(*session_id.as_uuid()))
    }

    /// Returns the session of an order, if one exists.
    pub async fn find_by_order(&self, order_id: &str) -> Option<SessionHandle> {
        let session_id = *self.by_order.read().await.get(order_id)?;
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Maps each part to its owning session.
    pub async fn index_parts(&self, session_id: SessionId, part_ids: &[PartId]) {
        if part_ids.is_empty() {
            return;
        }
        let mut parts = self.parts.write().await;
        for part_id in part_ids {
            parts.insert(*part_id, session_id);
        }
    }

    /// Forgets parts of a discarded split.
    pub async fn unindex_parts(&self, part_ids: &[PartId]) {
        if part_ids.is_empty() {
            return;
        }
        let mut parts = self.parts.write().await;
        for part_id in part_ids {
            parts.remove(part_id);
        }
    }

    /// Resolves the session owning a part.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PartNotFound`] if the part is unknown or
    /// belonged to a discarded split.
    pub async fn session_for_part(&self, part_id: PartId) -> Result<SessionId, GatewayError> {
        self.parts
            .read()
            .await
            .get(&part_id)
            .copied()
            .ok_or(GatewayError::PartNotFound(*part_id.as_uuid()))
    }

    /// Returns summaries of all sessions, oldest first, optionally
    /// filtered by status.
    pub async fn list(&self, status_filter: Option<SessionStatus>) -> Vec<SessionSummary> {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.read().await;
            if let Some(status) = status_filter
                && session.status != status
            {
                continue;
            }
            summaries.push(SessionSummary::from(&*session));
        }
        summaries.sort_by_key(|s| (s.created_at, s.id));
        summaries
    }

    /// Returns the ids of every stored session.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Loads previously persisted sessions, skipping ids already present.
    ///
    /// Returns the number of sessions restored.
    pub async fn restore(&self, sessions: Vec<PaymentSession>) -> usize {
        let mut restored = 0;
        for session in sessions {
            let session_id = session.id;
            match self.insert(session).await {
                Ok(_) => restored += 1,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "skipping persisted session");
                }
            }
        }
        restored
    }

    /// Returns the number of sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if the repository holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
