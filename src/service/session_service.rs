//! Session service: orchestrates the payment session state machine.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::ledger::{self, PaymentDraft};
use crate::domain::split_calculator::{self, SeatSplitInput};
use crate::domain::{
    EventBus, Money, OrderItem, PartId, Payment, PaymentId, PaymentSession, Seat,
    SeatItemAssociation, SeatId, SeatStore, SessionEvent, SessionId, SessionRepository,
    SessionStatus, SessionSummary, Split, SplitId, SplitParams, SplitPart,
};
use crate::error::GatewayError;
use crate::persistence::SessionJournal;

/// Failure reason recorded on pending payments the sweeper expires.
pub const EXPIRED_REASON: &str = "expired";

/// An ad-hoc payment request.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Opaque payment method tag.
    pub method: String,
    /// Amount to pay.
    pub amount: Money,
    /// Optional payer name.
    pub payer_name: Option<String>,
    /// Client idempotency key.
    pub request_id: Option<String>,
    /// Record as `pending` awaiting confirmation.
    pub pending: bool,
}

/// A request to pay one split part.
#[derive(Debug, Clone)]
pub struct PartPayment {
    /// Opaque payment method tag.
    pub method: String,
    /// Optional payer name; defaults to the part name.
    pub payer_name: Option<String>,
    /// Client idempotency key.
    pub request_id: Option<String>,
}

/// Outcome of a payment operation with the session totals after it.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    /// The payment.
    pub payment: Payment,
    /// The part it settled, for part payments.
    pub part: Option<SplitPart>,
    /// Session totals after the operation.
    pub session: SessionSummary,
    /// `true` when the request id was already processed and nothing changed.
    pub replayed: bool,
}

/// Orchestration layer for every session mutation.
///
/// Each mutation follows the same commit protocol: take the session's
/// write lock, apply the change to a clone, journal the clone with the
/// events it produced, swap it in, release the lock, publish the events.
/// A rejected or failed operation leaves the stored session untouched.
#[derive(Debug, Clone)]
pub struct SessionService {
    repository: Arc<SessionRepository>,
    seats: Arc<SeatStore>,
    event_bus: EventBus,
    journal: Option<Arc<dyn SessionJournal>>,
}

impl SessionService {
    /// Creates a new `SessionService`.
    #[must_use]
    pub fn new(
        repository: Arc<SessionRepository>,
        seats: Arc<SeatStore>,
        event_bus: EventBus,
        journal: Option<Arc<dyn SessionJournal>>,
    ) -> Self {
        Self {
            repository,
            seats,
            event_bus,
            journal,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`SessionRepository`].
    #[must_use]
    pub fn repository(&self) -> &Arc<SessionRepository> {
        &self.repository
    }

    /// Returns the session of `order_id`, creating it if none exists.
    ///
    /// The boolean is `true` when the session was created by this call.
    /// An existing session is returned whatever its status; a differing
    /// `total_amount` is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a blank order id or bad
    /// items (including quantities above [`OrderItem::MAX_QUANTITY`]),
    /// [`GatewayError::InvalidAmount`] for a non-positive or oversized
    /// total or unit price, and [`GatewayError::PersistenceError`] if the new
    /// session cannot be journaled.
    pub async fn open_session(
        &self,
        order_id: &str,
        total_amount: Money,
        items: Vec<OrderItem>,
    ) -> Result<(PaymentSession, bool), GatewayError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "order_id must not be empty".to_string(),
            ));
        }
        if !total_amount.is_positive() {
            return Err(GatewayError::InvalidAmount(format!(
                "total_amount must be positive, got {total_amount}"
            )));
        }
        if total_amount > Money::MAX {
            return Err(GatewayError::InvalidAmount(format!(
                "total_amount exceeds {}",
                Money::MAX
            )));
        }
        validate_items(&items)?;

        let creation = self.repository.creation_guard(order_id).await;
        if let Some(handle) = self.repository.find_by_order(order_id).await {
            let existing = handle.read().await.clone();
            if existing.total_amount != total_amount {
                tracing::warn!(
                    session_id = %existing.id,
                    order_id,
                    stored_total = %existing.total_amount,
                    requested_total = %total_amount,
                    "session already open with a different total; keeping the stored one"
                );
            }
            return Ok((existing, false));
        }

        let session = PaymentSession::new(order_id.to_string(), total_amount, items);
        let events = vec![SessionEvent::SessionOpened {
            session_id: session.id,
            order_id: session.order_id.clone(),
            total_amount,
            timestamp: session.created_at,
        }];
        self.commit(&session, &events).await?;
        self.repository.insert(session.clone()).await?;
        drop(creation);

        self.event_bus.publish_all(events);
        tracing::info!(session_id = %session.id, order_id, total = %total_amount, "session opened");
        Ok((session, true))
    }

    /// Returns a copy of the session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] for an unknown id.
    pub async fn get_session(&self, session_id: SessionId) -> Result<PaymentSession, GatewayError> {
        let handle = self.repository.get(session_id).await?;
        let session = handle.read().await.clone();
        Ok(session)
    }

    /// Returns one page of session summaries and the total match count.
    pub async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
        offset: usize,
        limit: usize,
    ) -> (Vec<SessionSummary>, usize) {
        let all = self.repository.list(status).await;
        let total = all.len();
        let page = all.into_iter().skip(offset).take(limit).collect();
        (page, total)
    }

    /// Returns every payment of the session in recording order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] for an unknown id.
    pub async fn list_payments(&self, session_id: SessionId) -> Result<Vec<Payment>, GatewayError> {
        let handle = self.repository.get(session_id).await?;
        let payments = handle.read().await.payments.clone();
        Ok(payments)
    }

    /// Records an ad-hoc payment against the session balance.
    ///
    /// A request carrying a `request_id` that was already applied returns
    /// the original payment and changes nothing, as long as the session is
    /// still open.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`],
    /// [`GatewayError::SessionClosed`], [`GatewayError::InvalidAmount`],
    /// [`GatewayError::Overpayment`] or [`GatewayError::PersistenceError`].
    pub async fn record_payment(
        &self,
        session_id: SessionId,
        request: NewPayment,
    ) -> Result<PaymentReceipt, GatewayError> {
        self.mutate(session_id, |session, events| {
            ledger::ensure_open(session)?;
            if let Some(receipt) = replay(session, request.request_id.as_deref()) {
                return Ok(receipt);
            }

            let now = Utc::now();
            let entry = ledger::record_payment(
                session,
                PaymentDraft {
                    method: request.method,
                    amount: request.amount,
                    payer_name: request.payer_name,
                    part_id: None,
                    request_id: request.request_id,
                    pending: request.pending,
                },
                now,
            )?;
            events.push(payment_recorded(session, &entry.payment, now));
            if entry.completed {
                events.push(completion(session, now));
            }

            tracing::info!(
                session_id = %session.id,
                payment_id = %entry.payment.id,
                amount = %entry.payment.amount,
                status = entry.payment.status.as_str(),
                remaining = %session.remaining_amount(),
                "payment recorded"
            );
            Ok(receipt(session, entry.payment, None, false))
        })
        .await
    }

    /// Confirms a pending payment. Confirming twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`],
    /// [`GatewayError::PaymentNotFound`], [`GatewayError::PaymentNotPending`]
    /// for failed payments, [`GatewayError::SessionClosed`] or
    /// [`GatewayError::PersistenceError`].
    pub async fn confirm_payment(
        &self,
        session_id: SessionId,
        payment_id: PaymentId,
    ) -> Result<PaymentReceipt, GatewayError> {
        self.mutate(session_id, |session, events| {
            let now = Utc::now();
            let entry = ledger::confirm_payment(session, payment_id, now)?;
            if entry.changed {
                events.push(SessionEvent::PaymentConfirmed {
                    session_id: session.id,
                    payment_id,
                    amount: entry.payment.amount,
                    remaining_amount: session.remaining_amount(),
                    timestamp: now,
                });
                tracing::info!(session_id = %session.id, %payment_id, "payment confirmed");
            }
            if entry.completed {
                events.push(completion(session, now));
            }
            Ok(receipt(session, entry.payment, None, !entry.changed))
        })
        .await
    }

    /// Marks a pending payment as failed, releasing its reservation.
    /// Failing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`],
    /// [`GatewayError::PaymentNotFound`], [`GatewayError::PaymentNotPending`]
    /// for confirmed payments, or [`GatewayError::PersistenceError`].
    pub async fn fail_payment(
        &self,
        session_id: SessionId,
        payment_id: PaymentId,
        reason: &str,
    ) -> Result<PaymentReceipt, GatewayError> {
        let reason = match reason.trim() {
            "" => "failed",
            r => r,
        };
        self.mutate(session_id, |session, events| {
            let now = Utc::now();
            let entry = ledger::fail_payment(session, payment_id, reason, now)?;
            if entry.changed {
                events.push(SessionEvent::PaymentFailed {
                    session_id: session.id,
                    payment_id,
                    amount: entry.payment.amount,
                    reason: reason.to_string(),
                    timestamp: now,
                });
                tracing::info!(session_id = %session.id, %payment_id, reason, "payment failed");
            }
            Ok(receipt(session, entry.payment, None, !entry.changed))
        })
        .await
    }

    /// Creates (or replaces) the session's active split over its current
    /// outstanding balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`],
    /// [`GatewayError::SessionClosed`], [`GatewayError::InvalidSplit`],
    /// [`GatewayError::SplitMismatch`], [`GatewayError::SeatNotFound`],
    /// [`GatewayError::SplitAlreadyActiveWithPayments`] or
    /// [`GatewayError::PersistenceError`].
    pub async fn create_split(
        &self,
        session_id: SessionId,
        params: SplitParams,
    ) -> Result<Split, GatewayError> {
        let seat_context = match &params {
            SplitParams::Seat { seat_ids, .. } => Some(self.seat_context(seat_ids).await?),
            SplitParams::Equal { .. } | SplitParams::Custom { .. } => None,
        };
        let strategy = params.strategy();

        self.mutate(session_id, move |session, events| {
            ledger::ensure_open(session)?;
            if let Some(active) = &session.active_split
                && active.has_paid_parts()
            {
                return Err(GatewayError::SplitAlreadyActiveWithPayments(
                    *session.id.as_uuid(),
                ));
            }
            let amount = ledger::available_amount(session);
            if !amount.is_positive() {
                return Err(GatewayError::InvalidSplit(
                    "nothing left to split".to_string(),
                ));
            }

            let (drafts, adjustment) = match params {
                SplitParams::Equal {
                    number_of_parts,
                    names,
                } => (
                    split_calculator::equal_split(amount, number_of_parts, &names)?,
                    None,
                ),
                SplitParams::Custom { parts } => {
                    let pairs: Vec<(String, Money)> =
                        parts.into_iter().map(|p| (p.name, p.amount)).collect();
                    (split_calculator::custom_split(amount, &pairs)?, None)
                }
                SplitParams::Seat {
                    include_shared_items,
                    ..
                } => {
                    let context = seat_context.ok_or_else(|| {
                        GatewayError::Internal("seat split without seat context".to_string())
                    })?;
                    let plan = split_calculator::seat_split(SeatSplitInput {
                        total: amount,
                        seats: &context.seats,
                        items: &session.items,
                        associations: &context.associations,
                        include_shared_items,
                    })?;
                    (plan.parts, plan.adjustment)
                }
            };

            let now = Utc::now();
            let split_id = SplitId::new();
            let parts: Vec<SplitPart> = drafts
                .into_iter()
                .map(|d| SplitPart {
                    id: PartId::new(),
                    split_id,
                    name: d.name,
                    amount: d.amount,
                    seat_id: d.seat_id,
                    is_paid: d.amount.is_zero(),
                    paid_by_payment_id: None,
                })
                .collect();
            if parts.iter().map(|p| p.amount).sum::<Money>() != amount {
                return Err(GatewayError::Internal(format!(
                    "split parts do not reconcile to {amount}"
                )));
            }

            let split = Split {
                id: split_id,
                session_id: session.id,
                strategy,
                amount,
                parts,
                adjustment,
                created_at: now,
            };
            if let Some(previous) = session.active_split.replace(split.clone()) {
                events.push(SessionEvent::SplitDiscarded {
                    session_id: session.id,
                    split_id: previous.id,
                    timestamp: now,
                });
            }
            session.updated_at = now;
            events.push(SessionEvent::SplitCreated {
                session_id: session.id,
                split_id,
                strategy,
                amount,
                parts: split.parts.clone(),
                adjustment: split.adjustment.clone(),
                timestamp: now,
            });

            tracing::info!(
                session_id = %session.id,
                %split_id,
                strategy = strategy.as_str(),
                parts = split.parts.len(),
                amount = %amount,
                "split created"
            );
            Ok(split)
        })
        .await
    }

    /// Returns the active split.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] or
    /// [`GatewayError::NoActiveSplit`].
    pub async fn active_split(&self, session_id: SessionId) -> Result<Split, GatewayError> {
        let handle = self.repository.get(session_id).await?;
        let session = handle.read().await;
        session
            .active_split
            .clone()
            .ok_or(GatewayError::NoActiveSplit(*session_id.as_uuid()))
    }

    /// Discards the active split while none of its parts is paid.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`],
    /// [`GatewayError::SessionClosed`], [`GatewayError::NoActiveSplit`],
    /// [`GatewayError::SplitAlreadyActiveWithPayments`] or
    /// [`GatewayError::PersistenceError`].
    pub async fn discard_split(&self, session_id: SessionId) -> Result<Split, GatewayError> {
        self.mutate(session_id, |session, events| {
            ledger::ensure_open(session)?;
            let Some(active) = &session.active_split else {
                return Err(GatewayError::NoActiveSplit(*session.id.as_uuid()));
            };
            if active.has_paid_parts() {
                return Err(GatewayError::SplitAlreadyActiveWithPayments(
                    *session.id.as_uuid(),
                ));
            }
            let now = Utc::now();
            let discarded = session
                .active_split
                .take()
                .ok_or(GatewayError::NoActiveSplit(*session.id.as_uuid()))?;
            session.updated_at = now;
            events.push(SessionEvent::SplitDiscarded {
                session_id: session.id,
                split_id: discarded.id,
                timestamp: now,
            });
            tracing::info!(session_id = %session.id, split_id = %discarded.id, "split discarded");
            Ok(discarded)
        })
        .await
    }

    /// Pays one part of the active split in full.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PartNotFound`],
    /// [`GatewayError::PartAlreadyPaid`], [`GatewayError::SessionClosed`],
    /// [`GatewayError::Overpayment`] (when ad-hoc payments already covered
    /// part of the balance), or [`GatewayError::PersistenceError`].
    pub async fn pay_part(
        &self,
        part_id: PartId,
        request: PartPayment,
    ) -> Result<PaymentReceipt, GatewayError> {
        let session_id = self.repository.session_for_part(part_id).await?;
        self.mutate(session_id, |session, events| {
            ledger::ensure_open(session)?;
            if let Some(receipt) = replay(session, request.request_id.as_deref()) {
                return Ok(receipt);
            }

            let (split_id, part) = {
                let split = session
                    .active_split
                    .as_ref()
                    .ok_or(GatewayError::PartNotFound(*part_id.as_uuid()))?;
                let part = split
                    .part(part_id)
                    .ok_or(GatewayError::PartNotFound(*part_id.as_uuid()))?;
                (split.id, part.clone())
            };
            if part.is_paid {
                return Err(GatewayError::PartAlreadyPaid(*part_id.as_uuid()));
            }

            let now = Utc::now();
            let entry = ledger::record_payment(
                session,
                PaymentDraft {
                    method: request.method,
                    amount: part.amount,
                    payer_name: request.payer_name.or_else(|| Some(part.name.clone())),
                    part_id: Some(part_id),
                    request_id: request.request_id,
                    pending: false,
                },
                now,
            )?;

            let paid_part = {
                let slot = session
                    .active_split
                    .as_mut()
                    .and_then(|s| s.part_mut(part_id))
                    .ok_or(GatewayError::PartNotFound(*part_id.as_uuid()))?;
                slot.is_paid = true;
                slot.paid_by_payment_id = Some(entry.payment.id);
                slot.clone()
            };

            events.push(payment_recorded(session, &entry.payment, now));
            events.push(SessionEvent::PartPaid {
                session_id: session.id,
                split_id,
                part_id,
                payment_id: entry.payment.id,
                amount: paid_part.amount,
                timestamp: now,
            });
            if entry.completed {
                events.push(completion(session, now));
            }

            tracing::info!(
                session_id = %session.id,
                %part_id,
                payment_id = %entry.payment.id,
                amount = %paid_part.amount,
                remaining = %session.remaining_amount(),
                "split part paid"
            );
            Ok(receipt(session, entry.payment, Some(paid_part), false))
        })
        .await
    }

    /// Fails every pending payment older than `timeout`. Returns how many
    /// were expired.
    pub async fn expire_pending_payments(&self, timeout: Duration) -> usize {
        let window = chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::weeks(52));
        let cutoff = Utc::now() - window;
        let mut expired_total = 0;

        for session_id in self.repository.ids().await {
            let result = self
                .mutate(session_id, |session, events| {
                    if session.is_completed() {
                        return Ok(0);
                    }
                    let now = Utc::now();
                    let expired = ledger::expire_pending(session, cutoff, now);
                    for payment in &expired {
                        tracing::warn!(
                            session_id = %session.id,
                            payment_id = %payment.id,
                            amount = %payment.amount,
                            "pending payment expired"
                        );
                        events.push(SessionEvent::PaymentFailed {
                            session_id: session.id,
                            payment_id: payment.id,
                            amount: payment.amount,
                            reason: EXPIRED_REASON.to_string(),
                            timestamp: now,
                        });
                    }
                    Ok(expired.len())
                })
                .await;
            match result {
                Ok(count) => expired_total += count,
                Err(e) => {
                    tracing::warn!(%session_id, error = %e, "pending payment sweep failed");
                }
            }
        }
        expired_total
    }

    /// Applies `apply` to a clone of the session under its write lock and
    /// commits the result if it produced events.
    async fn mutate<T, F>(&self, session_id: SessionId, apply: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&mut PaymentSession, &mut Vec<SessionEvent>) -> Result<T, GatewayError>,
    {
        let handle = self.repository.get(session_id).await?;
        let mut current = handle.write().await;
        let mut next = current.clone();
        let mut events = Vec::new();

        let value = apply(&mut next, &mut events)?;
        if events.is_empty() {
            return Ok(value);
        }

        self.commit(&next, &events).await?;

        let before = current.active_split.as_ref().map(|s| (s.id, s.part_ids()));
        let after = next.active_split.as_ref().map(|s| (s.id, s.part_ids()));
        if before.as_ref().map(|(id, _)| *id) != after.as_ref().map(|(id, _)| *id) {
            if let Some((_, parts)) = &before {
                self.repository.unindex_parts(parts).await;
            }
            if let Some((_, parts)) = &after {
                self.repository.index_parts(session_id, parts).await;
            }
        }

        *current = next;
        drop(current);

        self.event_bus.publish_all(events);
        Ok(value)
    }

    async fn commit(
        &self,
        session: &PaymentSession,
        events: &[SessionEvent],
    ) -> Result<(), GatewayError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        journal
            .commit_session(session, events)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session.id, error = %e, "journal commit failed");
                match e {
                    GatewayError::PersistenceError(_) => e,
                    other => GatewayError::PersistenceError(other.to_string()),
                }
            })
    }

    async fn seat_context(&self, seat_ids: &[SeatId]) -> Result<SeatContext, GatewayError> {
        if seat_ids.is_empty() {
            return Err(GatewayError::InvalidSplit(
                "a seat split needs at least one seat".to_string(),
            ));
        }
        let seats = self.seats.seats_by_ids(seat_ids).await?;
        let tables: HashSet<&str> = seats.iter().map(|s| s.table_id.as_str()).collect();
        let Some(table_id) = tables.iter().next().map(|t| (*t).to_string()) else {
            return Err(GatewayError::InvalidSplit(
                "a seat split needs at least one seat".to_string(),
            ));
        };
        if tables.len() > 1 {
            return Err(GatewayError::InvalidSplit(
                "all seats of a split must belong to the same table".to_string(),
            ));
        }
        let associations = self.seats.associations_for_table(&table_id).await;
        Ok(SeatContext {
            seats,
            associations,
        })
    }
}

#[derive(Debug)]
struct SeatContext {
    seats: Vec<Seat>,
    associations: Vec<SeatItemAssociation>,
}

fn validate_items(items: &[OrderItem]) -> Result<(), GatewayError> {
    let mut seen = HashSet::new();
    for item in items {
        if item.id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "order item id must not be empty".to_string(),
            ));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(GatewayError::InvalidRequest(format!(
                "duplicate order item {:?}",
                item.id
            )));
        }
        if item.quantity == 0 || item.quantity > OrderItem::MAX_QUANTITY {
            return Err(GatewayError::InvalidRequest(format!(
                "order item {:?} quantity must be between 1 and {}, got {}",
                item.id,
                OrderItem::MAX_QUANTITY,
                item.quantity
            )));
        }
        if item.unit_price.is_negative() || item.unit_price > Money::MAX {
            return Err(GatewayError::InvalidAmount(format!(
                "order item {:?} unit price {} is out of range",
                item.id, item.unit_price
            )));
        }
    }
    Ok(())
}

fn replay(session: &PaymentSession, request_id: Option<&str>) -> Option<PaymentReceipt> {
    let payment = session.replayed(request_id)?.clone();
    tracing::debug!(
        session_id = %session.id,
        payment_id = %payment.id,
        request_id,
        "request already processed; returning original payment"
    );
    let part = payment.part_id.and_then(|part_id| {
        session
            .active_split
            .as_ref()
            .and_then(|s| s.part(part_id))
            .cloned()
    });
    Some(receipt(session, payment, part, true))
}

fn receipt(
    session: &PaymentSession,
    payment: Payment,
    part: Option<SplitPart>,
    replayed: bool,
) -> PaymentReceipt {
    PaymentReceipt {
        payment,
        part,
        session: SessionSummary::from(session),
        replayed,
    }
}

fn payment_recorded(session: &PaymentSession, payment: &Payment, now: DateTime<Utc>) -> SessionEvent {
    SessionEvent::PaymentRecorded {
        session_id: session.id,
        payment: payment.clone(),
        paid_amount: session.paid_amount(),
        remaining_amount: session.remaining_amount(),
        timestamp: now,
    }
}

fn completion(session: &PaymentSession, now: DateTime<Utc>) -> SessionEvent {
    tracing::info!(session_id = %session.id, order_id = %session.order_id, "session completed");
    SessionEvent::SessionCompleted {
        session_id: session.id,
        total_amount: session.total_amount,
        paid_amount: session.paid_amount(),
        timestamp: now,
    }
}
