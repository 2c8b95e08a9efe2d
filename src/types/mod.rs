//! Shared value conversions.

pub mod conversions;
