//! Viewport-driven map client for municipal buildings, zoning, and land use.
//!
//! The crate keeps a map view consistent with a remote data service while
//! the user pans, filters, and clicks: the domain coordinator decides what
//! is fetched and what is displayed, outbound adapters talk HTTP and hold
//! map state, and the inbound event loop debounces renderer events.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
