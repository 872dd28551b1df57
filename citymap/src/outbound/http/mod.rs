//! Data service outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `FeatureSource`
//! port.

mod dto;
mod http_source;

pub use http_source::HttpFeatureSource;
