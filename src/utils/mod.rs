//! Utility modules for input coercion

pub mod coerce;

pub use coerce::*;
