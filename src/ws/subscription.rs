//! Per-connection subscription filter.
//!
//! A client follows a set of sessions (or every session with `"*"`) and
//! may narrow the stream to a few event kinds, e.g. only
//! `session_completed` for a kitchen display.

use std::collections::HashSet;

use crate::domain::{SessionEvent, SessionId};

/// Event kind that no [`SessionEvent`] carries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type {0:?}")]
pub struct UnknownEventType(pub String);

/// What a single WebSocket connection wants to receive.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    session_ids: HashSet<SessionId>,
    subscribe_all: bool,
    /// Empty means every kind.
    event_types: HashSet<&'static str>,
}

impl SubscriptionManager {
    /// Creates a manager that forwards nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows `ids`, or every session when `wildcard` is set.
    pub fn subscribe(&mut self, ids: &[SessionId], wildcard: bool) {
        self.subscribe_all |= wildcard;
        self.session_ids.extend(ids.iter().copied());
    }

    /// Drops `ids`. `wildcard` clears the follow-everything flag.
    pub fn unsubscribe(&mut self, ids: &[SessionId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.session_ids.remove(id);
        }
    }

    /// Replaces the event-kind filter. An empty list forwards every kind.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownEventType`] for a name no event carries; the
    /// previous filter is kept.
    pub fn set_event_types(&mut self, names: &[String]) -> Result<(), UnknownEventType> {
        let mut kinds = HashSet::with_capacity(names.len());
        for name in names {
            let kind = SessionEvent::EVENT_TYPES
                .iter()
                .find(|k| **k == name.as_str())
                .ok_or_else(|| UnknownEventType(name.clone()))?;
            kinds.insert(*kind);
        }
        self.event_types = kinds;
        Ok(())
    }

    /// Returns `true` if `event` should be forwarded to the client.
    #[must_use]
    pub fn matches(&self, event: &SessionEvent) -> bool {
        let followed = self.subscribe_all || self.session_ids.contains(&event.session_id());
        followed && (self.event_types.is_empty() || self.event_types.contains(event.event_type_str()))
    }

    /// Number of explicitly followed sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.session_ids.len()
    }

    /// Returns `true` if every session is followed.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }

    /// Active kind filter, sorted; empty when every kind is forwarded.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.event_types.iter().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Money, SplitId};
    use chrono::Utc;

    fn completed(session_id: SessionId) -> SessionEvent {
        SessionEvent::SessionCompleted {
            session_id,
            total_amount: Money::from_minor(2_000),
            paid_amount: Money::from_minor(2_000),
            timestamp: Utc::now(),
        }
    }

    fn discarded(session_id: SessionId) -> SessionEvent {
        SessionEvent::SplitDiscarded {
            session_id,
            split_id: SplitId::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn nothing_is_forwarded_before_subscribing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(&completed(SessionId::new())));
    }

    #[test]
    fn followed_session_gets_every_kind_by_default() {
        let mut mgr = SubscriptionManager::new();
        let table_7 = SessionId::new();
        mgr.subscribe(&[table_7], false);

        assert!(mgr.matches(&completed(table_7)));
        assert!(mgr.matches(&discarded(table_7)));
        assert!(!mgr.matches(&completed(SessionId::new())));
    }

    #[test]
    fn kind_filter_narrows_wildcard_stream() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.set_event_types(&["session_completed".to_string()]).is_ok());

        let any = SessionId::new();
        assert!(mgr.matches(&completed(any)));
        assert!(!mgr.matches(&discarded(any)));
        assert_eq!(mgr.event_types(), ["session_completed"]);

        assert!(mgr.set_event_types(&[]).is_ok());
        assert!(mgr.matches(&discarded(any)));
    }

    #[test]
    fn unknown_kind_keeps_previous_filter() {
        let mut mgr = SubscriptionManager::new();
        assert!(mgr.set_event_types(&["part_paid".to_string()]).is_ok());
        let result = mgr.set_event_types(&["part_paid".to_string(), "tip_added".to_string()]);
        assert_eq!(result, Err(UnknownEventType("tip_added".to_string())));
        assert_eq!(mgr.event_types(), ["part_paid"]);
    }

    #[test]
    fn unsubscribing_wildcard_keeps_explicit_sessions() {
        let mut mgr = SubscriptionManager::new();
        let kept = SessionId::new();
        mgr.subscribe(&[kept], true);
        mgr.unsubscribe(&[], true);

        assert!(!mgr.is_subscribed_all());
        assert!(mgr.matches(&completed(kept)));
        assert!(!mgr.matches(&completed(SessionId::new())));

        mgr.unsubscribe(&[kept], false);
        assert_eq!(mgr.count(), 0);
        assert!(!mgr.matches(&completed(kept)));
    }
}
