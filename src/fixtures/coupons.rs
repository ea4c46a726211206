//! Coupon Fixtures

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::Deserialize;

use crate::{
    coupons::draft::{CouponDraft, CouponScope},
    fixtures::FixtureError,
    orders::PurchasableRef,
};

/// Wrapper for coupons in YAML
#[derive(Debug, Deserialize)]
pub struct CouponsFixture {
    /// Map of fixture key -> coupon fixture
    pub coupons: FxHashMap<String, CouponFixture>,
}

/// Coupon Fixture
#[derive(Debug, Deserialize)]
pub struct CouponFixture {
    /// Coupon scope (`order` or `item`)
    pub scope: CouponScope,

    /// Display label
    pub title: String,

    /// Fixed discount amount (e.g., "2.00 GBP")
    #[serde(default)]
    pub amount: Option<String>,

    /// Percentage rate (e.g., "15%" or "0.15")
    #[serde(default)]
    pub percent: Option<String>,

    /// Cap on a percentage discount (e.g., "5.00 GBP")
    #[serde(default)]
    pub max_value: Option<String>,

    /// Start of the validity window (RFC 3339)
    #[serde(default)]
    pub valid_from: Option<Timestamp>,

    /// End of the validity window (RFC 3339)
    #[serde(default)]
    pub valid_until: Option<Timestamp>,

    /// Minimum line quantity (item scope only)
    #[serde(default)]
    pub min_quantity: u32,

    /// Minimum line or order subtotal (e.g., "20.00 GBP")
    #[serde(default)]
    pub min_subtotal: Option<String>,

    /// Remaining uses; omitted means unlimited
    #[serde(default)]
    pub uses: Option<u32>,

    /// Purchasable references (e.g., "product/5"; item scope only)
    #[serde(default)]
    pub purchasables: Vec<String>,

    /// Fixture keys of coupons this coupon stacks with, in this direction
    #[serde(default)]
    pub stacks_with: Vec<String>,
}

impl CouponFixture {
    /// Build a draft from this fixture, using the fixture key as the code.
    ///
    /// # Errors
    ///
    /// Returns an error if a money, percentage or purchasable string cannot
    /// be parsed.
    pub fn to_draft(&self, code: &str) -> Result<CouponDraft<'static>, FixtureError> {
        let mut draft = match self.scope {
            CouponScope::Order => CouponDraft::order(code, &self.title),
            CouponScope::Item => CouponDraft::item(code, &self.title),
        };

        if let Some(amount) = &self.amount {
            draft.amount = Some(parse_money(amount)?);
        }

        if let Some(percent) = &self.percent {
            draft.percent = Some(parse_percentage(percent)?);
        }

        if let Some(max_value) = &self.max_value {
            draft.max_value = Some(parse_money(max_value)?);
        }

        if let Some(min_subtotal) = &self.min_subtotal {
            draft.min_subtotal = Some(parse_money(min_subtotal)?);
        }

        draft.valid_from = self.valid_from;
        draft.valid_until = self.valid_until;
        draft.min_quantity = self.min_quantity;
        draft.remaining_uses = self.uses;

        draft.purchasables = self
            .purchasables
            .iter()
            .map(|purchasable| parse_purchasable(purchasable))
            .collect::<Result<_, _>>()?;

        Ok(draft)
    }
}

/// Parse a price string (e.g., "2.99 GBP") into a money value
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_money(s: &str) -> Result<Money<'static, Currency>, FixtureError> {
    let (minor_units, currency) = parse_price(s)?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Parse a price string (e.g., "2.99 GBP") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency_code = parts
        .get(1)
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    Ok((minor_units, parse_currency(currency_code)?))
}

/// Parse a currency code into one of the supported fixture currencies
///
/// # Errors
///
/// Returns an error if the currency code is not recognized.
pub fn parse_currency(code: &str) -> Result<&'static Currency, FixtureError> {
    match code {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        other => Err(FixtureError::UnknownCurrency(other.to_string())),
    }
}

/// Parse percentage string (e.g., "15%" or "0.15") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "15%" for 15%
/// - Decimal format: "0.15" for 15%
///
/// # Errors
///
/// Returns an error if the string cannot be parsed or if the value is invalid.
pub fn parse_percentage(s: &str) -> Result<Percentage, FixtureError> {
    let trimmed = s.trim();

    if let Some(percent_str) = trimmed.strip_suffix('%') {
        // Parse as percentage (e.g., "15%" -> 0.15)
        let value = percent_str
            .trim()
            .parse::<f64>()
            .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

        // Convert from percentage to decimal (15 -> 0.15)
        Ok(Percentage::from(value / 100.0))
    } else {
        // Parse as decimal (e.g., "0.15" -> 0.15)
        let value = trimmed
            .parse::<f64>()
            .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))?;

        Ok(Percentage::from(value))
    }
}

/// Parse a purchasable reference string (e.g., "product/5")
///
/// # Errors
///
/// Returns an error if the string is not in the format "KIND/ID" or the id
/// is not an integer.
pub fn parse_purchasable(s: &str) -> Result<PurchasableRef, FixtureError> {
    let Some((kind, id)) = s.split_once('/') else {
        return Err(FixtureError::InvalidPurchasable(format!(
            "Expected format 'KIND/ID', got: {s}"
        )));
    };

    let id = id
        .parse::<u64>()
        .map_err(|_err| FixtureError::InvalidPurchasable(s.to_string()))?;

    if kind.is_empty() {
        return Err(FixtureError::InvalidPurchasable(s.to_string()));
    }

    Ok(PurchasableRef::new(kind, id))
}
