//! Helpers for setting up throw-away databases in tests. Not intended for production use.
pub mod fixtures;
pub mod prepare_env;

pub use prepare_env::{
    create_database,
    drop_test_database,
    prepare_test_env,
    random_db_path,
    run_migrations,
    test_database,
};
