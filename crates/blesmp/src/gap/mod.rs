//! Generic Access Profile types shared across the stack

mod types;

pub use self::types::{AddressType, AddressWithType, BdAddr};
