//! FxLedger Common Types
//!
//! This crate contains the types shared across the FxLedger workspace:
//! validated currency codes, raw and canonical rates, conversion requests,
//! responses and records, the rounding and same-currency policies, and the
//! service-level error taxonomy.

pub mod currency;
pub mod rates;
pub mod conversion;
pub mod policy;
pub mod error;
pub mod time;

pub use currency::*;
pub use rates::*;
pub use conversion::*;
pub use policy::*;
pub use error::*;
pub use time::*;
