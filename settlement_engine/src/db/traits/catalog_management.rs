use crate::{
    db_types::{NewProduct, Product},
    engine_api::errors::SettlementError,
};

/// Read access to product stock, plus a minimal insert used for seeding.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, SettlementError>;

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError>;
}
