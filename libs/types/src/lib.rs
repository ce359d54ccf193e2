//! Types library for the market-data bridge
//!
//! Provides the core type definitions shared across the bridge,
//! ensuring type safety and deterministic numeric behavior.
//!
//! # Modules
//! - `ids`: Market identifiers (MarketKey, AssetPair)
//! - `numeric`: Canonical decimal rounding for the wire format
//! - `order`: Order book and trade sides

// Public modules
pub mod ids;
pub mod numeric;
pub mod order;

// Library version constant
pub const LIB_VERSION: &str = "0.1.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
}
