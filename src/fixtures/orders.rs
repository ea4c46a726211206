//! Order Fixtures

use serde::Deserialize;

use crate::{
    fixtures::{
        FixtureError,
        coupons::{parse_currency, parse_money, parse_purchasable},
    },
    orders::{Order, OrderId, OrderItem},
};

/// Wrapper for orders in YAML
#[derive(Debug, Deserialize)]
pub struct OrdersFixture {
    /// Orders in the fixture set
    pub orders: Vec<OrderFixture>,
}

/// Order Fixture
#[derive(Debug, Deserialize)]
pub struct OrderFixture {
    /// Order identifier
    pub id: u64,

    /// Order currency code (e.g., "GBP")
    pub currency: String,

    /// Line items
    #[serde(default)]
    pub items: Vec<OrderItemFixture>,
}

/// Order Item Fixture
#[derive(Debug, Deserialize)]
pub struct OrderItemFixture {
    /// Purchasable reference (e.g., "product/5")
    pub purchasable: String,

    /// Line quantity
    pub quantity: u32,

    /// Line subtotal (e.g., "9.00 GBP")
    pub subtotal: String,
}

impl TryFrom<OrderFixture> for Order<'_> {
    type Error = FixtureError;

    fn try_from(fixture: OrderFixture) -> Result<Self, Self::Error> {
        let currency = parse_currency(&fixture.currency)?;

        let items = fixture
            .items
            .iter()
            .map(|item| {
                Ok(OrderItem::new(
                    parse_purchasable(&item.purchasable)?,
                    item.quantity,
                    parse_money(&item.subtotal)?,
                ))
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        Ok(Order::with_items(OrderId(fixture.id), items, currency)?)
    }
}
