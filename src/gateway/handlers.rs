//! HTTP handlers, one submodule per resource

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{create_account, deposit, get_account_by_number, lookup_account};
pub use health::health_check;
pub use transfer::create_transfer;
