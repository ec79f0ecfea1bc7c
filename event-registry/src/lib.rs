//! Event Registry Library
//!
//! A small, synchronous event-listener registry that keeps its own authoritative
//! listener table and can optionally mirror registrations into an external
//! event backend (a "delegate").
//!
//! # Architecture
//!
//! - [`EventRegistry`] holds a deduplicated, insertion-ordered table of
//!   `(event, listener)` pairs and at most one [`Delegate`]
//! - `add_listener` / `remove_listener` update the table and forward to the
//!   delegate when one is installed
//! - `emit` only ever dispatches to the local table
//! - Installing a delegate with different hooks flushes every registration
//!   through the previous delegate first
//!
//! The library does NOT:
//! - Dispatch asynchronously or by priority
//! - Match wildcard event names
//! - Isolate failing listeners from each other
//!
//! # Example Usage
//!
//! ```
//! use event_registry::{EventRegistry, Listener, RecordingDelegate};
//! use serde_json::json;
//!
//! let registry = EventRegistry::new();
//! let backend = RecordingDelegate::new();
//! registry.set_implementation(backend.delegate()).unwrap();
//!
//! let listener = Listener::new(|payload| {
//!     println!("got {:?}", payload);
//!     Ok(())
//! });
//! registry.add_listener("tick", &listener, &[]).unwrap();
//! registry.emit("tick", Some(json!("payload"))).unwrap();
//!
//! assert_eq!(backend.calls().len(), 1);
//! ```

// Public modules
pub mod config;
pub mod delegate;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use config::{PayloadPolicy, RegistryConfig};
pub use delegate::{Delegate, DelegateCall, DelegateHook, RecordingDelegate};
pub use registry::{global, EventRegistry};
pub use types::{DelegateOperation, Listener, Payload, Registration, RegistryError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
