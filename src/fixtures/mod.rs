//! Fixtures
//!
//! YAML-defined coupon books and orders for tests and demos. A fixture set
//! is a pair of files, `coupons/<name>.yml` and `orders/<name>.yml`, under
//! a base path (`./fixtures` by default).

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    coupons::{Coupon, CouponKey, book::CouponBook, draft::DefinitionErrors},
    orders::{Order, OrderError},
};

pub mod coupons;
pub mod orders;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Invalid purchasable reference
    #[error("Invalid purchasable reference: {0}")]
    InvalidPurchasable(String),

    /// Coupon not found
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Order not found
    #[error("Order not found: {0}")]
    OrderNotFound(usize),

    /// Coupon definition rejected by validation
    #[error(transparent)]
    Definition(#[from] DefinitionErrors),

    /// Order construction error
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// A loaded fixture set: a coupon book plus orders to run it against.
#[derive(Debug)]
pub struct Fixture<'a> {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Coupon book built from the coupon fixture file
    book: CouponBook<'a>,

    /// Fixture key -> `CouponKey` mapping for lookups
    coupon_keys: FxHashMap<String, CouponKey>,

    /// Orders built from the order fixture file
    orders: Vec<Order<'a>>,
}

impl<'a> Fixture<'a> {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            book: CouponBook::new(),
            coupon_keys: FxHashMap::default(),
            orders: Vec::new(),
        }
    }

    /// Load coupons (and their stacking declarations) from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if a coupon
    /// definition fails validation, or if a `stacks_with` entry names an
    /// unknown coupon.
    pub fn load_coupons(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("coupons").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: coupons::CouponsFixture = serde_norway::from_str(&contents)?;

        // First pass inserts every coupon so stacking declarations can refer
        // to coupons defined later in the same file.
        for (key, coupon_fixture) in &fixture.coupons {
            let draft = coupon_fixture.to_draft(key)?;
            let coupon_key = self.book.insert(draft)?;

            self.coupon_keys.insert(key.clone(), coupon_key);
        }

        for (key, coupon_fixture) in &fixture.coupons {
            let from = self.coupon_key(key)?;

            for target in &coupon_fixture.stacks_with {
                let to = self.coupon_key(target)?;

                self.book.allow_stacking(from, to);
            }
        }

        Ok(self)
    }

    /// Load orders from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an order
    /// fails construction (for example, a currency mismatch).
    pub fn load_orders(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("orders").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: orders::OrdersFixture = serde_norway::from_str(&contents)?;

        for order_fixture in fixture.orders {
            self.orders.push(order_fixture.try_into()?);
        }

        Ok(self)
    }

    /// Load a complete fixture set (coupons and orders with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if either fixture file cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_coupons(name)?.load_orders(name)?;

        Ok(fixture)
    }

    /// Get a coupon key by its fixture key
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon is not found.
    pub fn coupon_key(&self, key: &str) -> Result<CouponKey, FixtureError> {
        self.coupon_keys
            .get(key)
            .copied()
            .ok_or_else(|| FixtureError::CouponNotFound(key.to_string()))
    }

    /// Get a coupon by its fixture key
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon is not found.
    pub fn coupon(&self, key: &str) -> Result<&Coupon<'a>, FixtureError> {
        self.book
            .get(self.coupon_key(key)?)
            .ok_or_else(|| FixtureError::CouponNotFound(key.to_string()))
    }

    /// The coupon book built from the fixture set
    pub fn book(&self) -> &CouponBook<'a> {
        &self.book
    }

    /// The coupon book, mutably (capture tests decrement through it)
    pub fn book_mut(&mut self) -> &mut CouponBook<'a> {
        &mut self.book
    }

    /// All loaded orders
    pub fn orders(&self) -> &[Order<'a>] {
        &self.orders
    }

    /// Get an order by position in the fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    pub fn order(&self, idx: usize) -> Result<&Order<'a>, FixtureError> {
        self.orders.get(idx).ok_or(FixtureError::OrderNotFound(idx))
    }
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}
