//! Eligibility
//!
//! Decides whether a coupon may be applied to an order. Every built-in
//! check runs and the result accumulates all failures, so callers can show
//! a customer everything that is wrong at once, not just the first reason.

use std::{borrow::Cow, fmt};

use jiff::Timestamp;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    coupons::Coupon,
    orders::{Order, OrderError},
};

/// A single reason a coupon is not eligible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EligibilityError {
    /// The validity window has not opened yet.
    #[error("this coupon is not active yet")]
    NotYetActive,

    /// The validity window has closed.
    #[error("this coupon has expired")]
    Expired,

    /// The coupon is usage-limited and has no uses left.
    #[error("this coupon has no remaining uses")]
    NoRemainingUses,

    /// No line item (or order aggregate) met the coupon's activation test.
    #[error("no items in the order qualify for this coupon")]
    NoMatchedItems,

    /// A failure appended by a registered extension check.
    #[error("{0}")]
    Custom(Cow<'static, str>),
}

/// Accumulated outcome of evaluating one coupon against one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    errors: SmallVec<[EligibilityError; 4]>,
}

impl Eligibility {
    /// Whether the coupon may be applied.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every failure found, in check order.
    pub fn errors(&self) -> &[EligibilityError] {
        &self.errors
    }

    /// Whether a particular failure was recorded.
    pub fn contains(&self, error: &EligibilityError) -> bool {
        self.errors.contains(error)
    }
}

/// Extension check callback: may append further failures.
pub type Check<'a> =
    Box<dyn Fn(&Coupon<'a>, &Order<'a>, &mut SmallVec<[EligibilityError; 4]>) + 'a>;

/// Evaluates coupon eligibility against orders.
///
/// Collaborators may register extension [`Check`]s, which run after the
/// built-in checks on every evaluation and may only append failures.
#[derive(Default)]
pub struct Evaluator<'a> {
    checks: Vec<Check<'a>>,
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator with no extension checks.
    #[must_use]
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Register an extension check, run after the built-in checks in
    /// registration order.
    pub fn add_check(
        &mut self,
        check: impl Fn(&Coupon<'a>, &Order<'a>, &mut SmallVec<[EligibilityError; 4]>) + 'a,
    ) {
        self.checks.push(Box::new(check));
    }

    /// Evaluate a coupon against an order at the given instant.
    ///
    /// Ineligibility is data, not an error: the `Err` channel carries only
    /// money-arithmetic failures from subtotal aggregation.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if the order subtotal cannot be calculated.
    pub fn evaluate(
        &self,
        coupon: &Coupon<'a>,
        order: &Order<'a>,
        now: Timestamp,
    ) -> Result<Eligibility, OrderError> {
        let mut errors: SmallVec<[EligibilityError; 4]> = SmallVec::new();
        let terms = coupon.terms();

        if let Some(from) = terms.valid_from()
            && now < from
        {
            errors.push(EligibilityError::NotYetActive);
        }

        if let Some(until) = terms.valid_until()
            && now > until
        {
            errors.push(EligibilityError::Expired);
        }

        if terms.remaining_uses() == Some(0) {
            errors.push(EligibilityError::NoRemainingUses);
        }

        // The item scan is the expensive check; skip it when the coupon is
        // already invalid for cheaper reasons.
        if errors.is_empty() && !Self::matches_items(coupon, order)? {
            errors.push(EligibilityError::NoMatchedItems);
        }

        for check in &self.checks {
            check(coupon, order, &mut errors);
        }

        Ok(Eligibility { errors })
    }

    fn matches_items(coupon: &Coupon<'a>, order: &Order<'a>) -> Result<bool, OrderError> {
        match coupon {
            Coupon::Order(order_coupon) => order_coupon.is_active_for(order),
            Coupon::Item(item_coupon) => Ok(order
                .iter()
                .filter(|item| item_coupon.applies_to(item))
                .any(|item| item_coupon.is_active_for(item))),
        }
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{
        coupons::{book::CouponBook, draft::CouponDraft},
        orders::{OrderId, OrderItem, PurchasableRef},
    };

    use super::*;

    const NOW: &str = "2026-04-01T12:00:00Z";

    fn now() -> Timestamp {
        NOW.parse().unwrap_or_default()
    }

    fn order_with_line(subtotal_minor: i64, quantity: u32) -> Order<'static> {
        let item = OrderItem::new(
            PurchasableRef::new("product", 5),
            quantity,
            Money::from_minor(subtotal_minor, GBP),
        );

        match Order::with_items(OrderId(1), [item], GBP) {
            Ok(order) => order,
            Err(err) => panic!("order construction failed: {err}"),
        }
    }

    fn validated(book: &CouponBook<'static>, draft: CouponDraft<'static>) -> Coupon<'static> {
        match draft.validate(book) {
            Ok(coupon) => coupon,
            Err(err) => panic!("draft should validate: {err}"),
        }
    }

    fn base_order_draft(code: &str) -> CouponDraft<'static> {
        let mut draft = CouponDraft::order(code, code);
        draft.amount = Some(Money::from_minor(100, GBP));

        draft
    }

    #[test]
    fn coupon_before_window_is_not_yet_active() -> TestResult {
        let book = CouponBook::new();
        let mut draft = base_order_draft("EARLY");
        draft.valid_from = Some("2026-05-01T00:00:00Z".parse()?);

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(!result.is_valid());
        assert!(result.contains(&EligibilityError::NotYetActive));

        Ok(())
    }

    #[test]
    fn coupon_after_window_is_expired() -> TestResult {
        let book = CouponBook::new();
        let mut draft = base_order_draft("LATE");
        draft.valid_until = Some("2026-03-01T00:00:00Z".parse()?);

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(result.contains(&EligibilityError::Expired));

        Ok(())
    }

    #[test]
    fn window_bounds_are_inclusive() -> TestResult {
        let book = CouponBook::new();
        let mut draft = base_order_draft("EDGE");
        draft.valid_from = Some(NOW.parse()?);
        draft.valid_until = Some(NOW.parse()?);

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(result.is_valid());

        Ok(())
    }

    #[test]
    fn exhausted_coupon_reports_no_remaining_uses() -> TestResult {
        let book = CouponBook::new();
        let mut draft = base_order_draft("USEDUP");
        draft.remaining_uses = Some(0);

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(result.contains(&EligibilityError::NoRemainingUses));

        Ok(())
    }

    #[test]
    fn item_scan_is_skipped_once_an_earlier_check_failed() -> TestResult {
        let book = CouponBook::new();

        // Exhausted, and also matching nothing: only the cheap failure shows.
        let mut draft = CouponDraft::item("DOUBLE", "Doubly Broken");
        draft.percent = Some(Percentage::from(0.1));
        draft.remaining_uses = Some(0);

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(result.contains(&EligibilityError::NoRemainingUses));
        assert!(!result.contains(&EligibilityError::NoMatchedItems));

        Ok(())
    }

    #[test]
    fn item_coupon_without_matching_purchasable_has_no_matched_items() -> TestResult {
        let book = CouponBook::new();

        let mut draft = CouponDraft::item("OTHER", "Other Product");
        draft.percent = Some(Percentage::from(0.1));
        draft.purchasables = [PurchasableRef::new("product", 99)].into_iter().collect();

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(result.contains(&EligibilityError::NoMatchedItems));

        Ok(())
    }

    #[test]
    fn item_coupon_minimums_gate_the_match() -> TestResult {
        let book = CouponBook::new();

        let mut draft = CouponDraft::item("BULK", "Bulk Discount");
        draft.percent = Some(Percentage::from(0.1));
        draft.min_quantity = 3;
        draft.purchasables = [PurchasableRef::new("product", 5)].into_iter().collect();

        let coupon = validated(&book, draft);

        let thin = order_with_line(1000, 2);
        let bulk = order_with_line(1000, 3);

        let evaluator = Evaluator::new();

        assert!(!evaluator.evaluate(&coupon, &thin, now())?.is_valid());
        assert!(evaluator.evaluate(&coupon, &bulk, now())?.is_valid());

        Ok(())
    }

    #[test]
    fn order_coupon_minimum_subtotal_gates_the_match() -> TestResult {
        let book = CouponBook::new();

        let mut draft = base_order_draft("BIGSPEND");
        draft.min_subtotal = Some(Money::from_minor(2000, GBP));

        let coupon = validated(&book, draft);

        let small = order_with_line(1000, 1);
        let large = order_with_line(2000, 1);

        let evaluator = Evaluator::new();

        assert!(
            evaluator
                .evaluate(&coupon, &small, now())?
                .contains(&EligibilityError::NoMatchedItems)
        );
        assert!(evaluator.evaluate(&coupon, &large, now())?.is_valid());

        Ok(())
    }

    #[test]
    fn extension_checks_append_after_built_ins() -> TestResult {
        let book = CouponBook::new();
        let coupon = validated(&book, base_order_draft("HOOKED"));
        let order = order_with_line(1000, 1);

        let mut evaluator = Evaluator::new();

        evaluator.add_check(|_coupon, _order, errors| {
            errors.push(EligibilityError::Custom(Cow::Borrowed(
                "members only, sorry",
            )));
        });

        let result = evaluator.evaluate(&coupon, &order, now())?;

        assert!(!result.is_valid());
        assert_eq!(
            result.errors(),
            [EligibilityError::Custom(Cow::Borrowed(
                "members only, sorry"
            ))]
        );

        Ok(())
    }

    #[test]
    fn extension_checks_run_even_when_built_ins_failed() -> TestResult {
        let book = CouponBook::new();

        let mut draft = base_order_draft("STACKED");
        draft.remaining_uses = Some(0);

        let coupon = validated(&book, draft);
        let order = order_with_line(1000, 1);

        let mut evaluator = Evaluator::new();

        evaluator.add_check(|_coupon, _order, errors| {
            errors.push(EligibilityError::Custom(Cow::Borrowed("blocked")));
        });

        let result = evaluator.evaluate(&coupon, &order, now())?;

        assert_eq!(result.errors().len(), 2);

        Ok(())
    }

    #[test]
    fn valid_coupon_collects_no_errors() -> TestResult {
        let book = CouponBook::new();
        let coupon = validated(&book, base_order_draft("CLEAN"));
        let order = order_with_line(1000, 1);

        let result = Evaluator::new().evaluate(&coupon, &order, now())?;

        assert!(result.is_valid());
        assert!(result.errors().is_empty());

        Ok(())
    }
}
