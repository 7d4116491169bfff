pub mod helpers;
pub mod op;
mod rupiah;
mod secret;

pub use helpers::{parse_boolean_flag, short_id};
pub use rupiah::{Rupiah, RupiahConversionError, RUPIAH_CURRENCY_CODE};
pub use secret::Secret;
