//! Inbound adapters that translate renderer and UI events into coordinator
//! calls while keeping scheduling details at the edge.

pub mod events;

pub use events::{DEFAULT_MOVE_DEBOUNCE, Debouncer, MapEvent, MapEventLoop};
