//! Account management module
//!
//! Account data model, identity validation, code generation and the
//! account service used by the gateway.

pub mod codegen;
pub mod models;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use codegen::CodeGenerator;
pub use models::{Account, AccountDetails, AccountId, AccountIdentity, NewAccount};
pub use service::{AccountError, AccountService};
pub use validation::{AccountNumber, SortCode, ValidationError};
