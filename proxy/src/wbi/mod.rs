//! WBI request signing: key material management and query signing.

pub mod keys;
pub mod sign;
pub mod tables;

pub use keys::{KeyManager, WbiKeys};
pub use sign::{Params, SignedQuery, WbiSigner};
