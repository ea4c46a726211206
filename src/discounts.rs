//! Discount amounts
//!
//! Turns an eligible coupon's benefit into the signed amount to add to an
//! order or line total. Amounts are always non-positive: whatever the
//! benefit, adjusters included, the result can only reduce the total.

use std::fmt;

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::coupons::{Benefit, Coupon};

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Adjuster callback: may replace the proposed discount, in minor units.
pub type Adjuster<'a> = Box<dyn Fn(&Coupon<'a>, &Money<'a, Currency>, i64) -> i64 + 'a>;

/// Computes discount amounts for coupons against a subtotal.
///
/// Collaborators may register [`Adjuster`]s that run after the built-in
/// benefit computation. The clamp to the subtotal and the forced negative
/// sign run last, so the non-positivity and never-exceeds-subtotal
/// guarantees hold whatever an adjuster returns.
#[derive(Default)]
pub struct Calculator<'a> {
    adjusters: Vec<Adjuster<'a>>,
}

impl fmt::Debug for Calculator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("adjusters", &self.adjusters.len())
            .finish()
    }
}

impl<'a> Calculator<'a> {
    /// Create a calculator with no adjusters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adjusters: Vec::new(),
        }
    }

    /// Register an adjuster, run after built-in benefit computation in
    /// registration order.
    pub fn add_adjuster(
        &mut self,
        adjuster: impl Fn(&Coupon<'a>, &Money<'a, Currency>, i64) -> i64 + 'a,
    ) {
        self.adjusters.push(Box::new(adjuster));
    }

    /// Compute the discount a coupon grants against a subtotal.
    ///
    /// The returned amount is non-positive and never exceeds the subtotal
    /// in magnitude. A zero subtotal yields a zero discount.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountError`] if percentage arithmetic overflows.
    pub fn amount_for(
        &self,
        coupon: &Coupon<'a>,
        subtotal: &Money<'a, Currency>,
    ) -> Result<Money<'a, Currency>, DiscountError> {
        let subtotal_minor = subtotal.to_minor_units().max(0);

        let base = match coupon.benefit() {
            Benefit::Amount(amount) => amount.to_minor_units(),
            Benefit::Percent { rate, cap } => {
                let raw = percent_of_minor(rate, subtotal_minor)?;

                match cap {
                    Some(cap) if raw > cap.to_minor_units() => cap.to_minor_units(),
                    _ => raw,
                }
            }
        };

        let adjusted = self
            .adjusters
            .iter()
            .fold(base, |proposed, adjuster| adjuster(coupon, subtotal, proposed));

        // A discount never exceeds what it discounts, and only ever reduces.
        let clamped = adjusted.abs().min(subtotal_minor);

        Ok(Money::from_minor(-clamped, subtotal.currency()))
    }
}

/// Calculate the discount amount in minor units based on a percentage and a
/// minor unit amount.
///
/// # Errors
///
/// Returns an error if:
/// - The percentage calculation overflows or cannot be safely represented (`DiscountError::PercentConversion`).
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage crate doesn't actually expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
