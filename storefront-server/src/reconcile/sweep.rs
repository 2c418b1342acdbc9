//! Compensating refund sweep
//!
//! Refund notifications can be lost entirely (webhook endpoint down past
//! the processor's retry horizon). This background task periodically polls
//! the payment intents of non-refunded orders and applies any refund the
//! webhook missed.

use chrono::{DateTime, Duration, Utc};

use crate::db::orders;
use crate::state::AppState;
use crate::stripe;

/// Orders older than this are past the processor's refund window and are
/// no longer polled.
const REFUND_WINDOW_DAYS: i64 = 90;

fn sweep_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(REFUND_WINDOW_DAYS)
}

/// Spawn the periodic refund sweep
pub fn spawn_refund_sweep(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_once(&state).await {
                tracing::error!("Refund sweep failed: {e}");
            }
        }
    });
}

/// One sweep pass: reconcile recent non-refunded orders against the
/// processor's view of their payments. Per-order failures are logged and
/// skipped so one flaky lookup does not starve the rest.
pub async fn sweep_once(state: &AppState) -> crate::error::ServiceResult<()> {
    let candidates = orders::list_unrefunded(&state.pool, sweep_cutoff(Utc::now())).await?;

    for (order_id, payment_intent) in candidates {
        let status = match stripe::fetch_payment_status(
            &state.http,
            &state.stripe_secret_key,
            &payment_intent,
        )
        .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(order_id, "Payment status lookup failed: {e}");
                continue;
            }
        };

        if status.refunded {
            match orders::mark_refunded(&state.pool, &payment_intent, Utc::now()).await {
                Ok(orders::RefundOutcome::Applied { order_id }) => {
                    tracing::info!(order_id, "Refund applied by sweep");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(order_id, "Sweep failed to apply refund: {e}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_bounds_candidates_to_refund_window() {
        let now = Utc::now();
        let cutoff = sweep_cutoff(now);
        assert_eq!(now - cutoff, Duration::days(90));
        assert!(cutoff < now);
    }
}
