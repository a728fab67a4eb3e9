//! Payment ledger: the only code that changes what a session has paid.
//!
//! Totals are pure functions over the session's payments:
//!
//! - `paid`      = sum of `confirmed` payments
//! - `reserved`  = sum of `pending` payments
//! - `remaining` = `total - paid`
//! - `available` = `remaining - reserved` (what a new payment may cover)
//!
//! Every function that can move `paid` re-evaluates completion in the
//! same call and reports the `open → completed` edge exactly once.

use chrono::{DateTime, Utc};

use super::{Money, PartId, Payment, PaymentId, PaymentSession, PaymentStatus, SessionStatus};
use crate::error::GatewayError;

/// Input for a new payment.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    /// Opaque payment method tag.
    pub method: String,
    /// Amount to pay.
    pub amount: Money,
    /// Optional payer name.
    pub payer_name: Option<String>,
    /// Split part being settled, if any.
    pub part_id: Option<PartId>,
    /// Client idempotency key.
    pub request_id: Option<String>,
    /// Record as `pending` instead of `confirmed`.
    pub pending: bool,
}

/// Outcome of a ledger operation.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// The payment after the operation.
    pub payment: Payment,
    /// `false` when the call was an idempotent no-op.
    pub changed: bool,
    /// `true` only for the call that moved the session to `completed`.
    pub completed: bool,
}

/// Sum of confirmed payments.
#[must_use]
pub fn paid_amount(session: &PaymentSession) -> Money {
    sum_with_status(session, PaymentStatus::Confirmed)
}

/// Sum of pending payments.
#[must_use]
pub fn reserved_amount(session: &PaymentSession) -> Money {
    sum_with_status(session, PaymentStatus::Pending)
}

/// `total - paid`.
#[must_use]
pub fn remaining_amount(session: &PaymentSession) -> Money {
    session.total_amount - paid_amount(session)
}

/// `remaining - reserved`: the most a new payment may cover.
#[must_use]
pub fn available_amount(session: &PaymentSession) -> Money {
    remaining_amount(session) - reserved_amount(session)
}

fn sum_with_status(session: &PaymentSession, status: PaymentStatus) -> Money {
    session
        .payments
        .iter()
        .filter(|p| p.status == status)
        .map(|p| p.amount)
        .sum()
}

/// Fails with [`GatewayError::SessionClosed`] on a completed session.
///
/// # Errors
///
/// Returns [`GatewayError::SessionClosed`] if the session is completed.
pub fn ensure_open(session: &PaymentSession) -> Result<(), GatewayError> {
    if session.is_completed() {
        return Err(GatewayError::SessionClosed(*session.id.as_uuid()));
    }
    Ok(())
}

/// Records a payment.
///
/// Requires `0 < amount <= available`. On violation nothing is mutated.
///
/// # Errors
///
/// Returns [`GatewayError::SessionClosed`], [`GatewayError::InvalidAmount`],
/// [`GatewayError::InvalidRequest`] (blank method) or
/// [`GatewayError::Overpayment`].
pub fn record_payment(
    session: &mut PaymentSession,
    draft: PaymentDraft,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, GatewayError> {
    ensure_open(session)?;

    if draft.method.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "payment method must not be empty".to_string(),
        ));
    }
    if !draft.amount.is_positive() {
        return Err(GatewayError::InvalidAmount(format!(
            "payment amount must be positive, got {}",
            draft.amount
        )));
    }
    let available = available_amount(session);
    if draft.amount > available {
        return Err(GatewayError::Overpayment {
            amount: draft.amount,
            remaining: available,
        });
    }

    let status = if draft.pending {
        PaymentStatus::Pending
    } else {
        PaymentStatus::Confirmed
    };
    let payment = Payment {
        id: PaymentId::new(),
        session_id: session.id,
        method: draft.method,
        amount: draft.amount,
        payer_name: draft.payer_name,
        status,
        part_id: draft.part_id,
        request_id: draft.request_id,
        failure_reason: None,
        created_at: now,
        settled_at: (!draft.pending).then_some(now),
    };

    if let Some(key) = &payment.request_id {
        session.processed_requests.insert(key.clone(), payment.id);
    }
    session.payments.push(payment.clone());
    session.updated_at = now;

    let completed = payment.is_confirmed() && settle(session, now);
    Ok(LedgerEntry {
        payment,
        changed: true,
        completed,
    })
}

/// Confirms a pending payment. Confirming an already-confirmed payment is
/// a no-op.
///
/// # Errors
///
/// Returns [`GatewayError::PaymentNotFound`],
/// [`GatewayError::PaymentNotPending`] for failed payments, or
/// [`GatewayError::SessionClosed`].
pub fn confirm_payment(
    session: &mut PaymentSession,
    payment_id: PaymentId,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, GatewayError> {
    let current = find_payment(session, payment_id)?.clone();
    match current.status {
        PaymentStatus::Confirmed => {
            return Ok(LedgerEntry {
                payment: current,
                changed: false,
                completed: false,
            });
        }
        PaymentStatus::Failed => {
            return Err(GatewayError::PaymentNotPending {
                payment_id: *payment_id.as_uuid(),
                status: PaymentStatus::Failed,
            });
        }
        PaymentStatus::Pending => {}
    }
    ensure_open(session)?;

    let payment = transition(session, payment_id, PaymentStatus::Confirmed, None, now)?;
    let completed = settle(session, now);
    Ok(LedgerEntry {
        payment,
        changed: true,
        completed,
    })
}

/// Marks a pending payment as failed. Failing an already-failed payment
/// is a no-op.
///
/// # Errors
///
/// Returns [`GatewayError::PaymentNotFound`] or
/// [`GatewayError::PaymentNotPending`] for confirmed payments.
pub fn fail_payment(
    session: &mut PaymentSession,
    payment_id: PaymentId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, GatewayError> {
    let current = find_payment(session, payment_id)?.clone();
    match current.status {
        PaymentStatus::Failed => Ok(LedgerEntry {
            payment: current,
            changed: false,
            completed: false,
        }),
        PaymentStatus::Confirmed => Err(GatewayError::PaymentNotPending {
            payment_id: *payment_id.as_uuid(),
            status: PaymentStatus::Confirmed,
        }),
        PaymentStatus::Pending => {
            let payment = transition(
                session,
                payment_id,
                PaymentStatus::Failed,
                Some(reason.to_string()),
                now,
            )?;
            Ok(LedgerEntry {
                payment,
                changed: true,
                completed: false,
            })
        }
    }
}

/// Fails every pending payment created before `cutoff`, returning them.
pub fn expire_pending(
    session: &mut PaymentSession,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<Payment> {
    let mut expired = Vec::new();
    for payment in &mut session.payments {
        if payment.is_pending() && payment.created_at < cutoff {
            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some("expired".to_string());
            payment.settled_at = Some(now);
            expired.push(payment.clone());
        }
    }
    if !expired.is_empty() {
        session.updated_at = now;
    }
    expired
}

fn find_payment(session: &PaymentSession, payment_id: PaymentId) -> Result<&Payment, GatewayError> {
    session
        .payment(payment_id)
        .ok_or(GatewayError::PaymentNotFound(*payment_id.as_uuid()))
}

fn transition(
    session: &mut PaymentSession,
    payment_id: PaymentId,
    status: PaymentStatus,
    failure_reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<Payment, GatewayError> {
    let payment = session
        .payments
        .iter_mut()
        .find(|p| p.id == payment_id)
        .ok_or(GatewayError::PaymentNotFound(*payment_id.as_uuid()))?;
    payment.status = status;
    payment.failure_reason = failure_reason;
    payment.settled_at = Some(now);
    let snapshot = payment.clone();
    session.updated_at = now;
    Ok(snapshot)
}

/// Moves an open session to `completed` when nothing remains. Returns
/// `true` only on the transition edge.
fn settle(session: &mut PaymentSession, now: DateTime<Utc>) -> bool {
    if session.status == SessionStatus::Open && !remaining_amount(session).is_positive() {
        session.status = SessionStatus::Completed;
        session.completed_at = Some(now);
        return true;
    }
    false
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn session(total: i64) -> PaymentSession {
        PaymentSession::new("order-1".to_string(), Money::from_minor(total), Vec::new())
    }

    fn draft(amount: i64) -> PaymentDraft {
        PaymentDraft {
            method: "cash".to_string(),
            amount: Money::from_minor(amount),
            payer_name: None,
            part_id: None,
            request_id: None,
            pending: false,
        }
    }

    fn pending(amount: i64) -> PaymentDraft {
        PaymentDraft {
            pending: true,
            ..draft(amount)
        }
    }

    #[test]
    fn partial_payment_keeps_session_open() {
        let mut s = session(5_000);
        let Ok(entry) = record_payment(&mut s, draft(3_000), Utc::now()) else {
            panic!("payment rejected");
        };
        assert!(!entry.completed);
        assert_eq!(paid_amount(&s), Money::from_minor(3_000));
        assert_eq!(remaining_amount(&s), Money::from_minor(2_000));
        assert_eq!(s.status, SessionStatus::Open);
    }

    #[test]
    fn overpayment_is_rejected_without_mutation() {
        let mut s = session(5_000);
        assert!(record_payment(&mut s, draft(3_000), Utc::now()).is_ok());

        let result = record_payment(&mut s, draft(2_500), Utc::now());
        let Err(GatewayError::Overpayment { amount, remaining }) = result else {
            panic!("expected overpayment");
        };
        assert_eq!(amount, Money::from_minor(2_500));
        assert_eq!(remaining, Money::from_minor(2_000));
        assert_eq!(s.payments.len(), 1);
    }

    #[test]
    fn exact_payment_completes_once() {
        let mut s = session(5_000);
        assert!(record_payment(&mut s, draft(3_000), Utc::now()).is_ok());
        let Ok(entry) = record_payment(&mut s, draft(2_000), Utc::now()) else {
            panic!("payment rejected");
        };
        assert!(entry.completed);
        assert!(s.is_completed());
        assert!(s.completed_at.is_some());
        assert_eq!(remaining_amount(&s), Money::ZERO);
    }

    #[test]
    fn non_positive_amount_is_invalid() {
        let mut s = session(1_000);
        assert!(matches!(
            record_payment(&mut s, draft(0), Utc::now()),
            Err(GatewayError::InvalidAmount(_))
        ));
        assert!(matches!(
            record_payment(&mut s, draft(-5), Utc::now()),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn blank_method_is_rejected() {
        let mut s = session(1_000);
        let mut d = draft(100);
        d.method = "  ".to_string();
        assert!(matches!(
            record_payment(&mut s, d, Utc::now()),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn completed_session_rejects_payments() {
        let mut s = session(1_000);
        assert!(record_payment(&mut s, draft(1_000), Utc::now()).is_ok());
        assert!(matches!(
            record_payment(&mut s, draft(1), Utc::now()),
            Err(GatewayError::SessionClosed(_))
        ));
        assert_eq!(paid_amount(&s), Money::from_minor(1_000));
    }

    #[test]
    fn pending_payment_reserves_balance_but_is_not_paid() {
        let mut s = session(1_000);
        let Ok(entry) = record_payment(&mut s, pending(600), Utc::now()) else {
            panic!("payment rejected");
        };
        assert!(entry.payment.is_pending());
        assert_eq!(paid_amount(&s), Money::ZERO);
        assert_eq!(reserved_amount(&s), Money::from_minor(600));
        assert_eq!(available_amount(&s), Money::from_minor(400));
        assert!(matches!(
            record_payment(&mut s, draft(500), Utc::now()),
            Err(GatewayError::Overpayment { .. })
        ));
    }

    #[test]
    fn confirm_is_idempotent_and_completes() {
        let mut s = session(1_000);
        let Ok(entry) = record_payment(&mut s, pending(1_000), Utc::now()) else {
            panic!("payment rejected");
        };
        let id = entry.payment.id;

        let Ok(first) = confirm_payment(&mut s, id, Utc::now()) else {
            panic!("confirm failed");
        };
        assert!(first.changed);
        assert!(first.completed);

        let Ok(second) = confirm_payment(&mut s, id, Utc::now()) else {
            panic!("repeat confirm failed");
        };
        assert!(!second.changed);
        assert!(!second.completed);
        assert_eq!(paid_amount(&s), Money::from_minor(1_000));
    }

    #[test]
    fn failed_payment_cannot_be_confirmed() {
        let mut s = session(1_000);
        let Ok(entry) = record_payment(&mut s, pending(400), Utc::now()) else {
            panic!("payment rejected");
        };
        let id = entry.payment.id;
        let Ok(failed) = fail_payment(&mut s, id, "declined", Utc::now()) else {
            panic!("fail failed");
        };
        assert_eq!(failed.payment.failure_reason.as_deref(), Some("declined"));
        assert_eq!(reserved_amount(&s), Money::ZERO);
        assert!(matches!(
            confirm_payment(&mut s, id, Utc::now()),
            Err(GatewayError::PaymentNotPending { .. })
        ));
    }

    #[test]
    fn confirmed_payment_cannot_fail() {
        let mut s = session(1_000);
        let Ok(entry) = record_payment(&mut s, draft(400), Utc::now()) else {
            panic!("payment rejected");
        };
        assert!(matches!(
            fail_payment(&mut s, entry.payment.id, "oops", Utc::now()),
            Err(GatewayError::PaymentNotPending { .. })
        ));
    }

    #[test]
    fn expire_only_touches_old_pending_payments() {
        let mut s = session(1_000);
        let old = Utc::now() - chrono::Duration::minutes(10);
        assert!(record_payment(&mut s, pending(100), old).is_ok());
        assert!(record_payment(&mut s, pending(200), Utc::now()).is_ok());
        assert!(record_payment(&mut s, draft(300), old).is_ok());

        let cutoff = Utc::now() - chrono::Duration::minutes(5);
        let expired = expire_pending(&mut s, cutoff, Utc::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(reserved_amount(&s), Money::from_minor(200));
        assert_eq!(paid_amount(&s), Money::from_minor(300));
    }

    #[test]
    fn request_id_is_remembered() {
        let mut s = session(1_000);
        let mut d = draft(100);
        d.request_id = Some("req-1".to_string());
        let Ok(entry) = record_payment(&mut s, d, Utc::now()) else {
            panic!("payment rejected");
        };
        let Some(replayed) = s.replayed(Some("req-1")) else {
            panic!("request id not recorded");
        };
        assert_eq!(replayed.id, entry.payment.id);
        assert!(s.replayed(Some("req-2")).is_none());
        assert!(s.replayed(None).is_none());
    }

    #[test]
    fn conservation_holds_across_operations() {
        let mut s = session(10_000);
        assert!(record_payment(&mut s, draft(1_234), Utc::now()).is_ok());
        assert!(record_payment(&mut s, pending(766), Utc::now()).is_ok());
        assert!(record_payment(&mut s, draft(4_000), Utc::now()).is_ok());
        assert_eq!(paid_amount(&s) + remaining_amount(&s), s.total_amount);
    }
}
