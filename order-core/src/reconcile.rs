//! Payment reconciliation
//!
//! Applies externally reported payment outcomes to local attempt and
//! order records. Callback delivery and active polling both funnel
//! through [`apply_status`], which is why it is idempotent: the same
//! terminal report may arrive several times over both paths.
//!
//! These functions run on the single-writer actor, so the idempotence
//! check is atomic with the state write and duplicate deliveries for
//! one reference cannot race each other.

use crate::{
    error::{Error, Result},
    metrics::Metrics,
    storage::Storage,
    types::{AttemptState, OrderStatus, PaymentAttempt},
};
use chrono::Utc;
use momo_gateway::ReferenceId;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Record a fresh PENDING attempt for an order
///
/// The gateway charge was already submitted by the caller (outside any
/// storage transaction); this re-runs the already-paid check atomically
/// before the attempt row lands, closing the race against a concurrent
/// successful reconciliation.
pub fn record_attempt(
    storage: &Storage,
    metrics: &Metrics,
    order_id: Uuid,
    reference: ReferenceId,
    amount: Decimal,
) -> Result<PaymentAttempt> {
    let _order = storage.get_order(order_id)?;

    if storage.has_successful_attempt(order_id)? {
        return Err(Error::OrderAlreadyPaid(order_id));
    }

    let now = Utc::now();
    let attempt = PaymentAttempt {
        reference,
        order_id,
        amount,
        state: AttemptState::Pending,
        created_at: now,
        last_checked: now,
    };

    storage.put_attempt_atomic(&attempt, None)?;
    metrics.record_payment_attempt();

    tracing::info!(
        reference = %attempt.reference,
        %order_id,
        amount = %amount,
        "Payment attempt recorded"
    );

    Ok(attempt)
}

/// Apply a gateway-reported state to an attempt (idempotent)
///
/// Terminal states never transition again: a duplicate delivery is a
/// no-op, a contradictory one surfaces as `ReconciliationConflict` for
/// the service boundary to log and swallow. On `PENDING -> SUCCESSFUL`
/// the owning order moves `pending -> processing` in the same write
/// batch as the attempt, so the two are never observably separated.
pub fn apply_status(
    storage: &Storage,
    metrics: &Metrics,
    reference: &ReferenceId,
    incoming: AttemptState,
    amount: Decimal,
) -> Result<()> {
    let mut attempt = storage.get_attempt(reference)?;

    if amount != attempt.amount {
        tracing::warn!(
            %reference,
            recorded = %attempt.amount,
            reported = %amount,
            "Gateway-reported amount disagrees with recorded attempt"
        );
        metrics.record_amount_mismatch();
    }

    if attempt.state.is_terminal() {
        if incoming == attempt.state {
            tracing::debug!(%reference, state = %incoming, "Duplicate terminal delivery, no-op");
            return Ok(());
        }
        if incoming.is_terminal() {
            metrics.record_reconciliation_conflict();
            return Err(Error::ReconciliationConflict(format!(
                "attempt {} already {}, gateway reported {}",
                reference, attempt.state, incoming
            )));
        }
        // Stale PENDING poll after a terminal outcome
        tracing::debug!(%reference, state = %attempt.state, "Stale pending report ignored");
        return Ok(());
    }

    let now = Utc::now();

    match incoming {
        AttemptState::Pending => {
            attempt.last_checked = now;
            storage.put_attempt_atomic(&attempt, None)?;
            Ok(())
        }

        AttemptState::Successful => {
            // At most one successful attempt per order
            if storage.has_successful_attempt(attempt.order_id)? {
                metrics.record_reconciliation_conflict();
                return Err(Error::ReconciliationConflict(format!(
                    "order {} already has a successful attempt, refusing {}",
                    attempt.order_id, reference
                )));
            }

            attempt.state = AttemptState::Successful;
            attempt.last_checked = now;

            let mut order = storage.get_order(attempt.order_id)?;
            let move_order = order.status == OrderStatus::Pending;
            if move_order {
                order.status = OrderStatus::Processing;
                order.updated_at = now;
            } else {
                tracing::warn!(
                    order_id = %order.order_id,
                    status = %order.status,
                    %reference,
                    "Payment succeeded but order already left pending"
                );
            }

            storage.put_attempt_atomic(&attempt, move_order.then_some(&order))?;
            metrics.record_payment_succeeded();

            tracing::info!(
                %reference,
                order_id = %attempt.order_id,
                "Payment successful, order processing"
            );
            Ok(())
        }

        AttemptState::Failed => {
            attempt.state = AttemptState::Failed;
            attempt.last_checked = now;
            // Order stays pending and eligible for a fresh attempt;
            // reserved stock is an operator/timeout concern.
            storage.put_attempt_atomic(&attempt, None)?;
            metrics.record_payment_failed();

            tracing::info!(
                %reference,
                order_id = %attempt.order_id,
                "Payment failed, order still pending"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Order, OrderStatus};
    use crate::Config;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, Metrics, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (
            Storage::open(&config).unwrap(),
            Metrics::new().unwrap(),
            temp_dir,
        )
    }

    fn seed_order(storage: &Storage) -> Order {
        let now = Utc::now();
        let order = Order {
            order_id: Uuid::now_v7(),
            user_id: Uuid::new_v4(),
            total: Decimal::new(250000, 2),
            status: OrderStatus::Pending,
            items: vec![],
            created_at: now,
            updated_at: now,
        };
        storage.commit_order(&order, &[]).unwrap();
        order
    }

    #[test]
    fn test_record_attempt() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);

        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        assert_eq!(attempt.state, AttemptState::Pending);
        assert_eq!(metrics.payment_attempts.get(), 1);
    }

    #[test]
    fn test_record_attempt_unknown_order() {
        let (storage, metrics, _temp) = test_storage();
        let err = record_attempt(
            &storage,
            &metrics,
            Uuid::new_v4(),
            ReferenceId::generate(),
            Decimal::TEN,
        )
        .unwrap_err();
        assert!(matches!(err, Error::OrderNotFound(_)));
    }

    #[test]
    fn test_no_attempt_after_success() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);

        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();
        apply_status(
            &storage,
            &metrics,
            &attempt.reference,
            AttemptState::Successful,
            order.total,
        )
        .unwrap();

        let err = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap_err();
        assert!(matches!(err, Error::OrderAlreadyPaid(_)));
    }

    #[test]
    fn test_success_moves_order_atomically() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);
        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        apply_status(
            &storage,
            &metrics,
            &attempt.reference,
            AttemptState::Successful,
            order.total,
        )
        .unwrap();

        assert_eq!(
            storage.get_attempt(&attempt.reference).unwrap().state,
            AttemptState::Successful
        );
        assert_eq!(
            storage.get_order(order.order_id).unwrap().status,
            OrderStatus::Processing
        );
    }

    #[test]
    fn test_duplicate_terminal_delivery_is_noop() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);
        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        apply_status(&storage, &metrics, &attempt.reference, AttemptState::Successful, order.total)
            .unwrap();
        let after_first = storage.get_attempt(&attempt.reference).unwrap();
        let order_after_first = storage.get_order(order.order_id).unwrap();

        apply_status(&storage, &metrics, &attempt.reference, AttemptState::Successful, order.total)
            .unwrap();

        // Records byte-identical after the second delivery
        assert_eq!(storage.get_attempt(&attempt.reference).unwrap(), after_first);
        assert_eq!(storage.get_order(order.order_id).unwrap(), order_after_first);
        assert_eq!(metrics.payments_succeeded.get(), 1);
    }

    #[test]
    fn test_contradictory_terminal_delivery_conflicts() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);
        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        apply_status(&storage, &metrics, &attempt.reference, AttemptState::Failed, order.total)
            .unwrap();

        let err = apply_status(
            &storage,
            &metrics,
            &attempt.reference,
            AttemptState::Successful,
            order.total,
        )
        .unwrap_err();

        assert!(matches!(err, Error::ReconciliationConflict(_)));
        assert_eq!(metrics.reconciliation_conflicts.get(), 1);
        // Record unchanged
        assert_eq!(
            storage.get_attempt(&attempt.reference).unwrap().state,
            AttemptState::Failed
        );
        assert_eq!(
            storage.get_order(order.order_id).unwrap().status,
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_failed_leaves_order_pending() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);
        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        apply_status(&storage, &metrics, &attempt.reference, AttemptState::Failed, order.total)
            .unwrap();

        assert_eq!(
            storage.get_order(order.order_id).unwrap().status,
            OrderStatus::Pending
        );

        // A fresh attempt is allowed after a failure
        let retry = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        );
        assert!(retry.is_ok());
    }

    #[test]
    fn test_amount_mismatch_logged_not_fatal() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);
        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        apply_status(
            &storage,
            &metrics,
            &attempt.reference,
            AttemptState::Successful,
            order.total + Decimal::ONE,
        )
        .unwrap();

        assert_eq!(metrics.amount_mismatches.get(), 1);
        assert_eq!(
            storage.get_attempt(&attempt.reference).unwrap().state,
            AttemptState::Successful
        );
    }

    #[test]
    fn test_pending_refresh_updates_last_checked_only() {
        let (storage, metrics, _temp) = test_storage();
        let order = seed_order(&storage);
        let attempt = record_attempt(
            &storage,
            &metrics,
            order.order_id,
            ReferenceId::generate(),
            order.total,
        )
        .unwrap();

        apply_status(&storage, &metrics, &attempt.reference, AttemptState::Pending, order.total)
            .unwrap();

        let refreshed = storage.get_attempt(&attempt.reference).unwrap();
        assert_eq!(refreshed.state, AttemptState::Pending);
        assert!(refreshed.last_checked >= attempt.last_checked);
    }
}
