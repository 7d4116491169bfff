pub mod gateway;
pub mod logging_hooks;
