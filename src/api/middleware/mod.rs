//! API Middleware Module

pub mod cors;

pub use cors::Cors;
