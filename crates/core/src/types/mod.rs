//! Core types for Vendora.
//!
//! This module provides type-safe wrappers for common domain concepts.

#[macro_use]
mod string_enum;

pub mod catalog;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use catalog::{Condition, Feature, Ram, Storage};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use status::*;
pub use string_enum::UnknownVariant;
