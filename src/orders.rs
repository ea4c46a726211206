//! Orders
//!
//! Read-side view of an order and its line items, as handed to the engine
//! by the surrounding order-management system. Monetary values arrive
//! already normalized to a single currency per order.

use std::fmt;

use rusty_money::{Money, MoneyError, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to order construction or totals.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An item's currency differs from the order currency (index, item currency, order currency).
    #[error("item {0} has currency {1}, but order has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// An item index was out of range.
    #[error("item {0} not found")]
    ItemNotFound(usize),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Identifier of an order owned by the surrounding system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order #{}", self.0)
    }
}

/// (class, id) pair naming the purchasable product behind a line item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchasableRef {
    /// Purchasable class, e.g. `product` or `variant`.
    pub kind: String,

    /// Identifier within the class.
    pub id: u64,
}

impl PurchasableRef {
    /// Create a purchasable reference from a class name and an id.
    pub fn new(kind: impl Into<String>, id: u64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl fmt::Display for PurchasableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A single order line.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem<'a> {
    purchasable: PurchasableRef,
    quantity: u32,
    subtotal: Money<'a, Currency>,
}

impl<'a> OrderItem<'a> {
    /// Create a new order line.
    #[must_use]
    pub fn new(purchasable: PurchasableRef, quantity: u32, subtotal: Money<'a, Currency>) -> Self {
        Self {
            purchasable,
            quantity,
            subtotal,
        }
    }

    /// The purchasable behind this line.
    pub fn purchasable(&self) -> &PurchasableRef {
        &self.purchasable
    }

    /// Quantity on this line.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Line subtotal, before any discounts.
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        &self.subtotal
    }
}

/// An order with its line items.
#[derive(Debug)]
pub struct Order<'a> {
    id: OrderId,
    items: Vec<OrderItem<'a>>,
    currency: &'static Currency,
}

impl<'a> Order<'a> {
    /// Create an empty order.
    #[must_use]
    pub fn new(id: OrderId, currency: &'static Currency) -> Self {
        Order {
            id,
            items: Vec::new(),
            currency,
        }
    }

    /// Create an order with the given items.
    ///
    /// # Errors
    ///
    /// Returns a `OrderError::CurrencyMismatch` if any item's currency differs
    /// from the order currency.
    pub fn with_items(
        id: OrderId,
        items: impl Into<Vec<OrderItem<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, OrderError> {
        let items = items.into();

        items.iter().enumerate().try_for_each(|(i, item)| {
            let item_currency = item.subtotal().currency();

            if item_currency == currency {
                Ok(())
            } else {
                Err(OrderError::CurrencyMismatch(
                    i,
                    item_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ))
            }
        })?;

        Ok(Order {
            id,
            items,
            currency,
        })
    }

    /// The order identifier.
    #[must_use]
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Calculate the order subtotal before discounts.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if money arithmetic fails.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, OrderError> {
        let total = self
            .items
            .iter()
            .try_fold(Money::from_minor(0, self.currency), |acc, item| {
                acc.add(*item.subtotal())
            })?;

        Ok(total)
    }

    /// Total quantity across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity())).sum()
    }

    /// Get a line item by index.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ItemNotFound` if the index is out of range.
    pub fn item(&self, idx: usize) -> Result<&OrderItem<'a>, OrderError> {
        self.items.get(idx).ok_or(OrderError::ItemNotFound(idx))
    }

    /// Iterate over the line items.
    pub fn iter(&self) -> impl Iterator<Item = &OrderItem<'_>> {
        self.items.iter()
    }

    /// Number of line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the order has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The order currency.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{
        Money,
        iso::{GBP, USD},
    };
    use testresult::TestResult;

    use super::*;

    fn test_items<'a>() -> [OrderItem<'a>; 3] {
        [
            OrderItem::new(PurchasableRef::new("product", 1), 1, Money::from_minor(100, GBP)),
            OrderItem::new(PurchasableRef::new("product", 2), 2, Money::from_minor(200, GBP)),
            OrderItem::new(PurchasableRef::new("variant", 3), 3, Money::from_minor(300, GBP)),
        ]
    }

    #[test]
    fn with_items_currency_mismatch_errors() {
        let items = [
            OrderItem::new(PurchasableRef::new("product", 1), 1, Money::from_minor(100, GBP)),
            OrderItem::new(PurchasableRef::new("product", 2), 1, Money::from_minor(100, USD)),
        ];

        let result = Order::with_items(OrderId(1), items, GBP);

        match result {
            Err(OrderError::CurrencyMismatch(idx, item_currency, order_currency)) => {
                assert_eq!(idx, 1);
                assert_eq!(item_currency, USD.iso_alpha_code);
                assert_eq!(order_currency, GBP.iso_alpha_code);
            }
            other => panic!("expected CurrencyMismatch error, got {other:?}"),
        }
    }

    #[test]
    fn subtotal_sums_line_subtotals() -> TestResult {
        let order = Order::with_items(OrderId(1), test_items(), GBP)?;

        assert_eq!(order.subtotal()?, Money::from_minor(600, GBP));

        Ok(())
    }

    #[test]
    fn subtotal_of_empty_order_is_zero() -> TestResult {
        let order = Order::new(OrderId(1), GBP);

        assert_eq!(order.subtotal()?, Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn total_quantity_sums_line_quantities() -> TestResult {
        let order = Order::with_items(OrderId(1), test_items(), GBP)?;

        assert_eq!(order.total_quantity(), 6);

        Ok(())
    }

    #[test]
    fn item_returns_line_by_index() -> TestResult {
        let order = Order::with_items(OrderId(1), test_items(), GBP)?;
        let item = order.item(1)?;

        assert_eq!(item.quantity(), 2);
        assert_eq!(item.subtotal(), &Money::from_minor(200, GBP));

        Ok(())
    }

    #[test]
    fn item_missing_returns_error() {
        let order = Order::new(OrderId(1), GBP);

        assert!(matches!(order.item(0), Err(OrderError::ItemNotFound(0))));
    }

    #[test]
    fn iter_returns_items_in_order() -> TestResult {
        let order = Order::with_items(OrderId(1), test_items(), GBP)?;

        let quantities: Vec<u32> = order.iter().map(OrderItem::quantity).collect();

        assert_eq!(quantities, vec![1, 2, 3]);

        Ok(())
    }

    #[test]
    fn len_and_is_empty() -> TestResult {
        let empty = Order::new(OrderId(1), GBP);
        let filled = Order::with_items(OrderId(2), test_items(), GBP)?;

        assert!(empty.is_empty());
        assert_eq!(filled.len(), 3);
        assert!(!filled.is_empty());

        Ok(())
    }

    #[test]
    fn purchasable_ref_displays_as_kind_slash_id() {
        let purchasable = PurchasableRef::new("product", 42);

        assert_eq!(purchasable.to_string(), "product/42");
    }

    #[test]
    fn order_id_displays_with_number() {
        assert_eq!(OrderId(7).to_string(), "order #7");
    }
}
