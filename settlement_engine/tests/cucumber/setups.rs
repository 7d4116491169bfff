use cucumber::given;
use settlement_engine::test_utils::fixtures::{place_order, platform_order, seed_products, store_order};

use crate::cucumber::{world::MarketSystem, MarketWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut MarketWorld) {
    let system = MarketSystem::new().await;
    world.system = Some(system);
}

#[given("the produce catalogue")]
async fn produce_catalogue(world: &mut MarketWorld) {
    seed_products(world.db()).await;
}

#[given(expr = "a store order {string} paid through {string}")]
async fn a_store_order(world: &mut MarketWorld, order_id: String, payment_id: String) {
    place_order(world.db(), store_order(&order_id, &payment_id)).await;
}

#[given(expr = "a platform order {string} paid through {string}")]
async fn a_platform_order(world: &mut MarketWorld, order_id: String, payment_id: String) {
    place_order(world.db(), platform_order(&order_id, &payment_id)).await;
}
