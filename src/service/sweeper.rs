//! Background maintenance tasks.
//!
//! Two periodic loops run beside the HTTP server: one expires pending
//! payments that were never confirmed, the other trims the event log of
//! long-completed sessions. The cleanup is opt-in.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::SessionService;
use crate::persistence::SessionJournal;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns the pending-payment sweeper.
///
/// Every `interval`, pending payments older than `timeout` are failed
/// with reason `"expired"`, releasing the balance they reserved.
pub fn spawn_pending_sweeper(
    service: Arc<SessionService>,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let expired = service.expire_pending_payments(timeout).await;
            if expired > 0 {
                tracing::info!(expired, "pending payment sweep finished");
            }
        }
    })
}

/// Spawns the journal cleanup loop, or returns `None` when `after_days`
/// is zero.
///
/// Only event rows are purged. Session snapshots stay, so a restart never
/// forgets that an order was settled.
pub fn spawn_journal_cleanup(
    journal: Arc<dyn SessionJournal>,
    after_days: u64,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if after_days == 0 {
        return None;
    }
    let Some(retention) = i64::try_from(after_days)
        .ok()
        .and_then(chrono::Duration::try_days)
    else {
        tracing::warn!(after_days, "cleanup retention out of range, journal cleanup disabled");
        return None;
    };
    Some(tokio::spawn(async move {
        let mut ticker = time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
                continue;
            };
            match journal.purge_completed_events_before(cutoff).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, %cutoff, "event log of completed sessions purged"),
                Err(e) => tracing::error!(error = %e, "journal cleanup failed"),
            }
        }
    }))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventBus, Money, SeatStore, SessionRepository};
    use crate::service::session_service::NewPayment;

    #[tokio::test]
    async fn sweeper_expires_stale_pending_payments() {
        let service = Arc::new(SessionService::new(
            Arc::new(SessionRepository::new()),
            Arc::new(SeatStore::new()),
            EventBus::new(100),
            None,
        ));
        let Ok((session, _)) = service
            .open_session("order-1", Money::from_minor(1_000), Vec::new())
            .await
        else {
            panic!("open failed");
        };
        let Ok(_) = service
            .record_payment(
                session.id,
                NewPayment {
                    method: "card".to_string(),
                    amount: Money::from_minor(1_000),
                    payer_name: None,
                    request_id: None,
                    pending: true,
                },
            )
            .await
        else {
            panic!("pending payment failed");
        };

        let mut rx = service.event_bus().subscribe();
        let handle = spawn_pending_sweeper(Arc::clone(&service), Duration::from_millis(20), Duration::ZERO);
        time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        let Ok(event) = rx.try_recv() else {
            panic!("expected an expiry event");
        };
        assert_eq!(event.event_type_str(), "payment_failed");
    }

    #[test]
    fn cleanup_disabled_for_zero_days() {
        #[derive(Debug)]
        struct NoJournal;

        #[async_trait::async_trait]
        impl SessionJournal for NoJournal {
            async fn commit_session(
                &self,
                _session: &crate::domain::PaymentSession,
                _events: &[crate::domain::SessionEvent],
            ) -> Result<(), crate::error::GatewayError> {
                Ok(())
            }
            async fn save_seat(
                &self,
                _record: &crate::domain::SeatRecord,
            ) -> Result<(), crate::error::GatewayError> {
                Ok(())
            }
            async fn load_sessions(
                &self,
            ) -> Result<Vec<crate::domain::PaymentSession>, crate::error::GatewayError> {
                Ok(Vec::new())
            }
            async fn load_seats(
                &self,
            ) -> Result<Vec<crate::domain::SeatRecord>, crate::error::GatewayError> {
                Ok(Vec::new())
            }
            async fn purge_completed_events_before(
                &self,
                _cutoff: chrono::DateTime<Utc>,
            ) -> Result<u64, crate::error::GatewayError> {
                Ok(0)
            }
        }

        assert!(spawn_journal_cleanup(Arc::new(NoJournal), 0, Duration::from_secs(60)).is_none());
        assert!(
            spawn_journal_cleanup(
                Arc::new(NoJournal),
                crate::config::DEFAULT_CLEANUP_AFTER_DAYS,
                Duration::from_secs(60)
            )
            .is_none()
        );
    }
}
