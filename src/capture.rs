//! Payment capture
//!
//! Consumes coupon uses when a payment is captured. Payment gateways
//! redeliver capture notifications, so the whole operation is idempotent:
//! each order-level add-on carries a `use_recorded` flag that flips exactly
//! once, and a flagged add-on is never touched again.

use tracing::warn;

use crate::{
    applications::Applications,
    coupons::{UseTaken, book::CouponBook},
    orders::OrderId,
};

/// Record coupon uses for a captured payment on an order.
///
/// For every order-level add-on not yet recorded: a usage-limited coupon
/// has one use consumed and the add-on flagged, as a single unit of work
/// under the `&mut` exclusivity of the single-writer-per-order model.
/// Unlimited coupons have nothing to record and are left untouched.
///
/// Bookkeeping inconsistencies (a counter already at zero, a dangling
/// coupon key) are logged and skipped rather than surfaced: a capture
/// notification must never fail on coupon bookkeeping.
///
/// Returns the number of counters actually decremented, so re-delivery of
/// the same capture returns 0.
pub fn payment_captured(
    book: &mut CouponBook<'_>,
    applications: &mut Applications,
    order: OrderId,
) -> usize {
    let mut decremented = 0;

    for applied in applications.order_coupons_mut(order) {
        if applied.use_recorded() {
            continue;
        }

        let Some(coupon) = book.get_mut(applied.coupon()) else {
            warn!(%order, "applied coupon no longer exists in the book; skipping");
            continue;
        };

        match coupon.take_use() {
            UseTaken::Unlimited => {}
            UseTaken::Taken { .. } => {
                applied.record_use();
                decremented += 1;
            }
            UseTaken::AlreadyExhausted => {
                // The counter stays at zero; still flag the add-on so
                // redelivery does not re-report the same inconsistency.
                warn!(
                    %order,
                    code = coupon.code(),
                    "coupon was already exhausted at capture time; use not decremented"
                );
                applied.record_use();
            }
        }
    }

    decremented
}
