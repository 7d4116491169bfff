use crate::engine_api::errors::CartError;

/// The only cart capability settlement needs. Cart management itself lives elsewhere.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Removes every item from the buyer's cart, returning the number of items removed.
    async fn clear_cart(&self, buyer_id: &str) -> Result<u64, CartError>;
}
