use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
pub use market_common::Rupiah;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The public identifier of an order, as shown to buyers and sellers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last 8 characters of the id, upper-cased. Used in payout notes and tracking entries.
    pub fn short_id(&self) -> String {
        market_common::short_id(&self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed, but no payment has been confirmed. Sellers do not see these orders.
    AwaitingPayment,
    /// Payment is confirmed and the seller must ship the order.
    Pending,
    Shipped,
    Delivered,
    Canceled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::AwaitingPayment => write!(f, "awaiting_payment"),
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Shipped => write!(f, "shipped"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Canceled => write!(f, "canceled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "pending" => Ok(Self::Pending),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "canceled" => Ok(Self::Canceled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------   ShippingAddress     ---------------------------------------------------------
/// A snapshot of the delivery address taken at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    /// The selling store. `None` for items sold by the platform itself.
    pub store_id: Option<String>,
    pub shipping_address: Json<ShippingAddress>,
    /// The id under which the payment gateway knows this order's payment. Several orders may share one.
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub payment_updated_at: Option<DateTime<Utc>>,
    pub total_price: Rupiah,
    pub seller_earnings: Option<Rupiah>,
    pub shipping_cost: Option<Rupiah>,
    pub admin_fee: Option<Rupiah>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub status: OrderStatusType,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn short_id(&self) -> String {
        self.order_id.short_id()
    }

    pub fn is_awaiting_payment(&self) -> bool {
        self.status == OrderStatusType::AwaitingPayment
    }
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
/// A line item as it was priced at checkout.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub name: String,
    pub price: Rupiah,
    pub quantity: i64,
    pub image: Option<String>,
}

impl OrderItem {
    /// `price × quantity`, or `None` if that does not fit in an `i64`.
    pub fn line_total(&self) -> Option<Rupiah> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    pub name: String,
    pub price: Rupiah,
    pub quantity: i64,
    pub image: Option<String>,
}

impl NewOrderItem {
    pub fn new<S: Into<String>>(product_id: S, name: S, price: Rupiah, quantity: i64) -> Self {
        Self { product_id: product_id.into(), name: name.into(), price, quantity, image: None }
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// An order as produced by checkout. Checkout itself is handled elsewhere; this is what gets stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub store_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub payment_id: Option<String>,
    /// If not given, the total is the sum of the line items, shipping cost and admin fee.
    pub total_price: Option<Rupiah>,
    pub seller_earnings: Option<Rupiah>,
    pub shipping_cost: Option<Rupiah>,
    pub admin_fee: Option<Rupiah>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(order_id: OrderId, buyer_id: S) -> Self {
        Self {
            order_id,
            buyer_id: buyer_id.into(),
            store_id: None,
            shipping_address: ShippingAddress::default(),
            payment_id: None,
            total_price: None,
            seller_earnings: None,
            shipping_cost: None,
            admin_fee: None,
            items: vec![],
        }
    }

    pub fn with_store<S: Into<String>>(mut self, store_id: S) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn with_shipping_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = address;
        self
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_seller_earnings(mut self, amount: Rupiah) -> Self {
        self.seller_earnings = Some(amount);
        self
    }

    pub fn with_shipping_cost(mut self, amount: Rupiah) -> Self {
        self.shipping_cost = Some(amount);
        self
    }

    pub fn with_admin_fee(mut self, amount: Rupiah) -> Self {
        self.admin_fee = Some(amount);
        self
    }

    pub fn with_total_price(mut self, amount: Rupiah) -> Self {
        self.total_price = Some(amount);
        self
    }

    /// The explicit total, or the sum of the line items, shipping cost and admin fee.
    ///
    /// Returns `None` if any line total, the computed total, or the amount the order would credit to the treasury does
    /// not fit in an `i64`. Such an order cannot be settled and must not be stored.
    pub fn total_price(&self) -> Option<Rupiah> {
        let line_totals = self.items.iter().map(|i| i.price.checked_mul(i.quantity)).collect::<Option<Vec<_>>>()?;
        let items_total = Rupiah::checked_sum(line_totals)?;
        let shipping = self.shipping_cost.unwrap_or_default();
        let admin_fee = self.admin_fee.unwrap_or_default();
        let seller_amount = self.seller_earnings.unwrap_or(items_total);
        Rupiah::checked_sum([seller_amount, shipping, admin_fee])?;
        match self.total_price {
            Some(total) => Some(total),
            None => Rupiah::checked_sum([items_total, shipping, admin_fee]),
        }
    }
}

//--------------------------------------    TrackingEntry      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackingEntry {
    pub status: OrderStatusType,
    pub title: String,
    pub description: String,
}

impl NewTrackingEntry {
    pub fn new(status: OrderStatusType, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { status, title: title.into(), description: description.into() }
    }
}

//--------------------------------------      FullOrder        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub tracking_history: Vec<TrackingEntry>,
}

//--------------------------------------       Product         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub store_id: Option<String>,
    pub name: String,
    pub price: Rupiah,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub id: String,
    pub store_id: Option<String>,
    pub name: String,
    pub price: Rupiah,
    pub stock: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(id: S, name: S, price: Rupiah, stock: i64) -> Self {
        Self { id: id.into(), store_id: None, name: name.into(), price, stock }
    }

    pub fn with_store<S: Into<String>>(mut self, store_id: S) -> Self {
        self.store_id = Some(store_id.into());
        self
    }
}

//--------------------------------------       Treasury        ---------------------------------------------------------
/// The platform ledger. The first three fields are running balances; the `total_*` fields are cumulative and never
/// decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Treasury {
    pub admin_fee_balance: Rupiah,
    pub shipping_balance: Rupiah,
    pub seller_pending_balance: Rupiah,
    pub total_admin_fee_earned: Rupiah,
    pub total_shipping_collected: Rupiah,
    pub total_seller_payouts: Rupiah,
    pub total_orders_processed: i64,
}

//--------------------------------------        Payout         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutType {
    OrderPayment,
    Manual,
}

impl Display for PayoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutType::OrderPayment => write!(f, "order_payment"),
            PayoutType::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::Pending => write!(f, "pending"),
            PayoutStatus::Completed => write!(f, "completed"),
            PayoutStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub product_total: Rupiah,
    pub shipping_cost: Rupiah,
    pub admin_fee: Rupiah,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payout {
    pub id: i64,
    pub store_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Rupiah,
    pub payout_type: PayoutType,
    pub status: PayoutStatus,
    #[sqlx(flatten)]
    pub breakdown: PayoutBreakdown,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayout {
    pub store_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Rupiah,
    pub payout_type: PayoutType,
    pub breakdown: PayoutBreakdown,
    pub notes: String,
}

//--------------------------------------   SettlementMode      ---------------------------------------------------------
/// How the settlement steps are executed against the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    /// All steps run inside one transaction.
    #[default]
    Atomic,
    /// Steps run one after the other on a plain connection. A crash part-way leaves partial effects.
    Sequential,
}

impl Display for SettlementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementMode::Atomic => write!(f, "atomic"),
            SettlementMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for SettlementMode {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(Self::Atomic),
            "sequential" => Ok(Self::Sequential),
            s => Err(ConversionError(format!("Invalid settlement mode: {s}"))),
        }
    }
}

//--------------------------------------    Role/Principal     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

/// An already-authenticated caller. Identity resolution happens upstream of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub roles: Vec<Role>,
    /// The store a seller acts for.
    pub store_id: Option<String>,
}

impl Principal {
    pub fn new<S: Into<String>>(id: S, roles: &[Role]) -> Self {
        Self { id: id.into(), roles: roles.to_vec(), store_id: None }
    }

    pub fn with_store<S: Into<String>>(mut self, store_id: S) -> Self {
        self.store_id = Some(store_id.into());
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_buyer_of(&self, order: &Order) -> bool {
        order.buyer_id == self.id
    }

    pub fn is_seller_of(&self, order: &Order) -> bool {
        self.has_role(Role::Seller) && self.store_id.is_some() && self.store_id == order.store_id
    }

    /// Admins can see everything, buyers see their own orders, and sellers see orders placed with their store.
    pub fn can_view(&self, order: &Order) -> bool {
        let visible = self.is_admin() || self.is_buyer_of(order) || self.is_seller_of(order);
        if !visible {
            trace!("Principal {} has no access to order {}", self.id, order.order_id);
        }
        visible
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_status_round_trips_through_strings() {
        for s in ["awaiting_payment", "pending", "shipped", "delivered", "canceled"] {
            let status = s.parse::<OrderStatusType>().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("paid".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn new_order_total_includes_fees() {
        let order = NewOrder::new("ord-1".into(), "buyer-1")
            .with_item(NewOrderItem::new("tomato", "Tomato", Rupiah::from(20_000), 3))
            .with_item(NewOrderItem::new("chili", "Chili", Rupiah::from(10_000), 2))
            .with_shipping_cost(Rupiah::from(15_000))
            .with_admin_fee(Rupiah::from(5_000));
        assert_eq!(order.total_price(), Some(Rupiah::from(100_000)));
        let order = order.with_total_price(Rupiah::from(1));
        assert_eq!(order.total_price(), Some(Rupiah::from(1)));
    }

    #[test]
    fn oversized_orders_have_no_total() {
        let huge = NewOrder::new("ord-2".into(), "buyer-1")
            .with_item(NewOrderItem::new("gold", "Gold", Rupiah::from(i64::MAX / 2), 3))
            .with_total_price(Rupiah::from(100));
        assert_eq!(huge.total_price(), None);
        let huge = NewOrder::new("ord-3".into(), "buyer-1")
            .with_item(NewOrderItem::new("gold", "Gold", Rupiah::from(i64::MAX - 10), 1))
            .with_shipping_cost(Rupiah::from(20));
        assert_eq!(huge.total_price(), None);
        let huge = NewOrder::new("ord-4".into(), "buyer-1")
            .with_seller_earnings(Rupiah::from(i64::MAX))
            .with_admin_fee(Rupiah::from(1));
        assert_eq!(huge.total_price(), None);
    }

    #[test]
    fn short_order_ids() {
        let id = OrderId::from("665f1c2a9b3e4d0012ab34cd");
        assert_eq!(id.short_id(), "12AB34CD");
        assert_eq!(id.to_string(), "#665f1c2a9b3e4d0012ab34cd");
    }

    #[test]
    fn roles_and_modes_parse() {
        assert_eq!(" Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
        assert_eq!("SEQUENTIAL".parse::<SettlementMode>().unwrap(), SettlementMode::Sequential);
        assert_eq!(SettlementMode::default(), SettlementMode::Atomic);
    }

    #[test]
    fn principal_roles() {
        let seller = Principal::new("u-2", &[Role::Seller, Role::Buyer]).with_store("store-1");
        assert!(seller.has_role(Role::Buyer));
        assert!(!seller.is_admin());
        assert_eq!(seller.store_id.as_deref(), Some("store-1"));
    }
}
