//! Coupon Drafts
//!
//! Loosely-typed coupon definitions as they arrive from an administrator,
//! validated into [`Coupon`] values. Validation runs every check and
//! accumulates all failures rather than stopping at the first.

use std::fmt;

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    coupons::{Benefit, Coupon, ItemCoupon, OrderCoupon, Terms, book::CouponBook},
    orders::PurchasableRef,
};

/// Which scope a draft targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponScope {
    /// Applies to an entire order.
    Order,

    /// Applies to individual order lines.
    Item,
}

/// A field that failed a non-negativity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The fixed discount amount.
    Amount,

    /// The percentage rate.
    Percent,

    /// The percentage cap.
    MaxValue,

    /// The minimum subtotal.
    MinSubTotal,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Amount => "amount",
            Field::Percent => "percentage",
            Field::MaxValue => "max value",
            Field::MinSubTotal => "minimum subtotal",
        };

        write!(f, "{name}")
    }
}

/// A single coupon definition failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The code was empty.
    #[error("coupon code must not be empty")]
    EmptyCode,

    /// The code is already taken by a coupon of either kind.
    #[error("coupon code `{0}` is already in use")]
    DuplicateCode(String),

    /// Neither an amount nor a percentage was set.
    #[error("coupon must set either an amount or a percentage")]
    MissingBenefit,

    /// Both an amount and a percentage were set.
    #[error("coupon cannot set both an amount and a percentage")]
    ConflictingBenefit,

    /// A monetary or rate field was negative.
    #[error("{0} must not be negative")]
    Negative(Field),

    /// The percentage rate exceeded 100%.
    #[error("percentage must not exceed 100%")]
    PercentOutOfRange,
}

fn join_errors(errors: &SmallVec<[DefinitionError; 4]>) -> String {
    let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();

    parts.join("; ")
}

/// Every failure found while validating one draft.
#[derive(Debug, Error)]
#[error("invalid coupon definition: {}", join_errors(.errors))]
pub struct DefinitionErrors {
    errors: SmallVec<[DefinitionError; 4]>,
}

impl DefinitionErrors {
    /// The individual failures, in check order.
    pub fn errors(&self) -> &[DefinitionError] {
        &self.errors
    }

    /// Whether a particular failure was recorded.
    pub fn contains(&self, error: &DefinitionError) -> bool {
        self.errors.contains(error)
    }
}

/// An unvalidated coupon definition.
#[derive(Debug, Clone)]
pub struct CouponDraft<'a> {
    /// Scope the coupon targets.
    pub scope: CouponScope,

    /// Coupon code; must be non-empty and unique across both kinds.
    pub code: String,

    /// Display label.
    pub title: String,

    /// Fixed discount amount. Zero counts as unset.
    pub amount: Option<Money<'a, Currency>>,

    /// Percentage rate in `[0, 1]`. Zero counts as unset.
    pub percent: Option<Percentage>,

    /// Cap on a percentage discount. Zero means "no cap".
    pub max_value: Option<Money<'a, Currency>>,

    /// Start of the validity window.
    pub valid_from: Option<Timestamp>,

    /// End of the validity window.
    pub valid_until: Option<Timestamp>,

    /// Minimum line quantity (item scope only).
    pub min_quantity: u32,

    /// Minimum line or order subtotal.
    pub min_subtotal: Option<Money<'a, Currency>>,

    /// Remaining uses; `None` disables usage limiting.
    pub remaining_uses: Option<u32>,

    /// Purchasables the coupon may apply to (item scope only).
    pub purchasables: FxHashSet<PurchasableRef>,
}

impl<'a> CouponDraft<'a> {
    /// Start an order-scoped draft with the given code and title.
    pub fn order(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(CouponScope::Order, code, title)
    }

    /// Start an item-scoped draft with the given code and title.
    pub fn item(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(CouponScope::Item, code, title)
    }

    fn new(scope: CouponScope, code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            scope,
            code: code.into(),
            title: title.into(),
            amount: None,
            percent: None,
            max_value: None,
            valid_from: None,
            valid_until: None,
            min_quantity: 0,
            min_subtotal: None,
            remaining_uses: None,
            purchasables: FxHashSet::default(),
        }
    }

    /// Validate the draft against the book and collapse it into a [`Coupon`].
    ///
    /// All checks run; the `Err` carries every failure found.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionErrors`] listing each violated rule.
    pub fn validate(self, book: &CouponBook<'a>) -> Result<Coupon<'a>, DefinitionErrors> {
        let mut errors: SmallVec<[DefinitionError; 4]> = SmallVec::new();

        if self.code.is_empty() {
            errors.push(DefinitionError::EmptyCode);
        } else if book.contains_code(&self.code) {
            errors.push(DefinitionError::DuplicateCode(self.code.clone()));
        }

        // Normalize before the exactly-one-of check: zero counts as unset.
        let amount = match self.amount {
            Some(amount) if amount.to_minor_units() < 0 => {
                errors.push(DefinitionError::Negative(Field::Amount));

                None
            }
            Some(amount) if amount.to_minor_units() == 0 => None,
            other => other,
        };

        let percent = match self.percent {
            Some(rate) => {
                let value = rate * Decimal::ONE;

                if value < Decimal::ZERO {
                    errors.push(DefinitionError::Negative(Field::Percent));

                    None
                } else if value > Decimal::ONE {
                    errors.push(DefinitionError::PercentOutOfRange);

                    None
                } else if value == Decimal::ZERO {
                    None
                } else {
                    Some(rate)
                }
            }
            None => None,
        };

        let cap = match self.max_value {
            Some(cap) if cap.to_minor_units() < 0 => {
                errors.push(DefinitionError::Negative(Field::MaxValue));

                None
            }
            Some(cap) if cap.to_minor_units() == 0 => None,
            other => other,
        };

        let min_subtotal = match self.min_subtotal {
            Some(min) if min.to_minor_units() < 0 => {
                errors.push(DefinitionError::Negative(Field::MinSubTotal));

                None
            }
            other => other,
        };

        let benefit = match (amount, percent) {
            (Some(amount), None) => Some(Benefit::Amount(amount)),
            (None, Some(rate)) => Some(Benefit::Percent { rate, cap }),
            (None, None) => {
                errors.push(DefinitionError::MissingBenefit);

                None
            }
            (Some(_), Some(_)) => {
                errors.push(DefinitionError::ConflictingBenefit);

                None
            }
        };

        let (Some(benefit), true) = (benefit, errors.is_empty()) else {
            return Err(DefinitionErrors { errors });
        };

        let terms = Terms {
            code: self.code,
            title: self.title,
            benefit,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            min_subtotal,
            remaining_uses: self.remaining_uses,
        };

        Ok(match self.scope {
            CouponScope::Order => Coupon::Order(OrderCoupon { terms }),
            CouponScope::Item => Coupon::Item(ItemCoupon {
                terms,
                min_quantity: self.min_quantity,
                purchasables: self.purchasables,
            }),
        })
    }
}
