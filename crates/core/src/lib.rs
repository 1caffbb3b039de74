//! `catalog-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{ImageId, ProductId};
