//! Coupon Applications
//!
//! Bookkeeping for coupons currently applied to orders and order lines.
//! Applying records an add-on; it performs no eligibility checking (that is
//! the caller's job, via [`crate::eligibility::Evaluator`], before applying).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{coupons::CouponKey, orders::OrderId};

/// An order-level coupon applied to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    coupon: CouponKey,
    use_recorded: bool,
}

impl AppliedCoupon {
    /// The applied coupon.
    #[must_use]
    pub fn coupon(&self) -> CouponKey {
        self.coupon
    }

    /// Whether a payment capture has already consumed a use through this
    /// add-on. Flips to true exactly once.
    #[must_use]
    pub fn use_recorded(&self) -> bool {
        self.use_recorded
    }

    pub(crate) fn record_use(&mut self) {
        self.use_recorded = true;
    }
}

/// An item-level coupon applied to one order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedItemCoupon {
    item_idx: usize,
    coupon: CouponKey,
}

impl AppliedItemCoupon {
    /// Index of the line the coupon is applied to.
    #[must_use]
    pub fn item_idx(&self) -> usize {
        self.item_idx
    }

    /// The applied coupon.
    #[must_use]
    pub fn coupon(&self) -> CouponKey {
        self.coupon
    }
}

#[derive(Debug, Default)]
struct OrderApplications {
    coupons: SmallVec<[AppliedCoupon; 2]>,
    item_coupons: SmallVec<[AppliedItemCoupon; 4]>,
}

impl OrderApplications {
    fn is_empty(&self) -> bool {
        self.coupons.is_empty() && self.item_coupons.is_empty()
    }
}

/// Registry of which coupons are applied to which orders and lines.
#[derive(Debug, Default)]
pub struct Applications {
    orders: FxHashMap<OrderId, OrderApplications>,
}

impl Applications {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: FxHashMap::default(),
        }
    }

    /// Apply an order-level coupon to an order.
    ///
    /// Returns `false` if that coupon was already applied to the order
    /// (a second add-on is never created).
    pub fn apply_to_order(&mut self, order: OrderId, coupon: CouponKey) -> bool {
        let entry = self.orders.entry(order).or_default();

        if entry.coupons.iter().any(|applied| applied.coupon == coupon) {
            return false;
        }

        entry.coupons.push(AppliedCoupon {
            coupon,
            use_recorded: false,
        });

        true
    }

    /// Apply an item-level coupon to one order line.
    ///
    /// Returns `false` if that coupon was already applied to that line.
    pub fn apply_to_item(&mut self, order: OrderId, item_idx: usize, coupon: CouponKey) -> bool {
        let entry = self.orders.entry(order).or_default();

        if entry
            .item_coupons
            .iter()
            .any(|applied| applied.coupon == coupon && applied.item_idx == item_idx)
        {
            return false;
        }

        entry.item_coupons.push(AppliedItemCoupon { item_idx, coupon });

        true
    }

    /// Remove all order-level add-ons from an order.
    pub fn clear_order_coupons(&mut self, order: OrderId) {
        if let Some(entry) = self.orders.get_mut(&order) {
            entry.coupons.clear();

            if entry.is_empty() {
                self.orders.remove(&order);
            }
        }
    }

    /// Remove all item-level add-ons from an order.
    pub fn clear_item_coupons(&mut self, order: OrderId) {
        if let Some(entry) = self.orders.get_mut(&order) {
            entry.item_coupons.clear();

            if entry.is_empty() {
                self.orders.remove(&order);
            }
        }
    }

    /// Drop every add-on for an order, as when the order itself is deleted.
    pub fn remove_order(&mut self, order: OrderId) {
        self.orders.remove(&order);
    }

    /// Whether any coupon, of either level, is applied to the order.
    #[must_use]
    pub fn has_coupons(&self, order: OrderId) -> bool {
        self.orders.get(&order).is_some_and(|entry| !entry.is_empty())
    }

    /// Order-level add-ons for an order.
    #[must_use]
    pub fn order_coupons(&self, order: OrderId) -> &[AppliedCoupon] {
        self.orders
            .get(&order)
            .map_or(&[], |entry| entry.coupons.as_slice())
    }

    /// Item-level add-ons for an order.
    #[must_use]
    pub fn item_coupons(&self, order: OrderId) -> &[AppliedItemCoupon] {
        self.orders
            .get(&order)
            .map_or(&[], |entry| entry.item_coupons.as_slice())
    }

    pub(crate) fn order_coupons_mut(
        &mut self,
        order: OrderId,
    ) -> impl Iterator<Item = &mut AppliedCoupon> {
        self.orders
            .get_mut(&order)
            .into_iter()
            .flat_map(|entry| entry.coupons.iter_mut())
    }
}
