//! Coupons
//!
//! Validated coupon definitions. A coupon is either order-scoped or
//! item-scoped; both share the same [`Terms`] and differ only in what
//! they apply to. Construct coupons through [`draft::CouponDraft`] so the
//! exactly-one-benefit and non-negativity rules hold by the time a
//! [`Coupon`] value exists.

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

use crate::orders::{Order, OrderError, OrderItem, PurchasableRef};

pub mod book;
pub mod draft;

new_key_type! {
    /// Coupon Key
    pub struct CouponKey;
}

/// The discount a coupon grants. Exactly one of the two forms, by construction.
#[derive(Debug, Clone, Copy)]
pub enum Benefit<'a> {
    /// Fixed amount off (e.g., "£2 off").
    Amount(Money<'a, Currency>),

    /// Percentage off, optionally capped at a fixed amount.
    Percent {
        /// Fraction of the subtotal to discount, in `[0, 1]`.
        rate: Percentage,

        /// Upper bound on the discount. `None` means uncapped.
        cap: Option<Money<'a, Currency>>,
    },
}

/// Outcome of consuming one use of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseTaken {
    /// The coupon does not limit uses; nothing to record.
    Unlimited,

    /// One use was consumed; `left` uses remain.
    Taken {
        /// Remaining uses after the decrement.
        left: u32,
    },

    /// The counter was already at zero and was not decremented.
    AlreadyExhausted,
}

/// Eligibility terms shared by both coupon kinds.
#[derive(Debug, Clone)]
pub struct Terms<'a> {
    pub(crate) code: String,
    pub(crate) title: String,
    pub(crate) benefit: Benefit<'a>,
    pub(crate) valid_from: Option<Timestamp>,
    pub(crate) valid_until: Option<Timestamp>,
    pub(crate) min_subtotal: Option<Money<'a, Currency>>,
    pub(crate) remaining_uses: Option<u32>,
}

impl<'a> Terms<'a> {
    /// Coupon code, unique across both coupon kinds.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display label.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The discount this coupon grants.
    pub fn benefit(&self) -> &Benefit<'a> {
        &self.benefit
    }

    /// Start of the validity window, if bounded.
    #[must_use]
    pub fn valid_from(&self) -> Option<Timestamp> {
        self.valid_from
    }

    /// End of the validity window, if bounded.
    #[must_use]
    pub fn valid_until(&self) -> Option<Timestamp> {
        self.valid_until
    }

    /// Minimum line or order subtotal required, if any.
    pub fn min_subtotal(&self) -> Option<&Money<'a, Currency>> {
        self.min_subtotal.as_ref()
    }

    /// Remaining uses. `None` means the coupon is not usage-limited.
    #[must_use]
    pub fn remaining_uses(&self) -> Option<u32> {
        self.remaining_uses
    }

    /// Whether a subtotal in minor units meets the minimum, if one is set.
    pub(crate) fn meets_min_subtotal(&self, subtotal_minor: i64) -> bool {
        self.min_subtotal
            .as_ref()
            .is_none_or(|min| subtotal_minor >= min.to_minor_units())
    }
}

/// A coupon applied to an entire order.
#[derive(Debug, Clone)]
pub struct OrderCoupon<'a> {
    pub(crate) terms: Terms<'a>,
}

impl<'a> OrderCoupon<'a> {
    /// Shared eligibility terms.
    pub fn terms(&self) -> &Terms<'a> {
        &self.terms
    }

    /// Whether the order-level aggregates meet this coupon's activation test.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if the order subtotal cannot be calculated.
    pub fn is_active_for(&self, order: &Order<'a>) -> Result<bool, OrderError> {
        let subtotal = order.subtotal()?;

        Ok(self.terms.meets_min_subtotal(subtotal.to_minor_units()))
    }
}

/// A coupon applied to individual order lines, restricted to a set of
/// purchasables.
#[derive(Debug, Clone)]
pub struct ItemCoupon<'a> {
    pub(crate) terms: Terms<'a>,
    pub(crate) min_quantity: u32,
    pub(crate) purchasables: FxHashSet<PurchasableRef>,
}

impl<'a> ItemCoupon<'a> {
    /// Shared eligibility terms.
    pub fn terms(&self) -> &Terms<'a> {
        &self.terms
    }

    /// Minimum line quantity required.
    #[must_use]
    pub fn min_quantity(&self) -> u32 {
        self.min_quantity
    }

    /// The purchasables this coupon may apply to.
    pub fn purchasables(&self) -> &FxHashSet<PurchasableRef> {
        &self.purchasables
    }

    /// Whether this coupon may apply to the given line at all.
    ///
    /// A line is applicable only if its purchasable is listed on the coupon.
    pub fn applies_to(&self, item: &OrderItem<'_>) -> bool {
        self.purchasables.contains(item.purchasable())
    }

    /// Whether the line meets this coupon's activation test.
    pub fn is_active_for(&self, item: &OrderItem<'_>) -> bool {
        item.quantity() >= self.min_quantity
            && self.terms.meets_min_subtotal(item.subtotal().to_minor_units())
    }
}

/// Coupon enum spanning both scopes.
#[derive(Debug, Clone)]
pub enum Coupon<'a> {
    /// Coupon applied to an entire order.
    Order(OrderCoupon<'a>),

    /// Coupon applied to individual order lines.
    Item(ItemCoupon<'a>),
}

impl<'a> Coupon<'a> {
    /// Shared eligibility terms.
    pub fn terms(&self) -> &Terms<'a> {
        match self {
            Coupon::Order(order_coupon) => order_coupon.terms(),
            Coupon::Item(item_coupon) => item_coupon.terms(),
        }
    }

    /// Coupon code, unique across both coupon kinds.
    #[must_use]
    pub fn code(&self) -> &str {
        self.terms().code()
    }

    /// The discount this coupon grants.
    pub fn benefit(&self) -> &Benefit<'a> {
        self.terms().benefit()
    }

    /// Whether this is an item-scoped coupon.
    #[must_use]
    pub fn is_item_scoped(&self) -> bool {
        matches!(self, Coupon::Item(_))
    }

    /// Consume one remaining use, clamping at zero.
    ///
    /// The counter only ever decreases, and only through this operation.
    /// [`crate::capture::payment_captured`] drives it once per recorded
    /// order-level application.
    pub fn take_use(&mut self) -> UseTaken {
        let terms = match self {
            Coupon::Order(order_coupon) => &mut order_coupon.terms,
            Coupon::Item(item_coupon) => &mut item_coupon.terms,
        };

        match terms.remaining_uses {
            None => UseTaken::Unlimited,
            Some(0) => UseTaken::AlreadyExhausted,
            Some(left) => {
                terms.remaining_uses = Some(left - 1);

                UseTaken::Taken { left: left - 1 }
            }
        }
    }
}
