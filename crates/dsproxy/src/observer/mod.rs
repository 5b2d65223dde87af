//! Observers notified before and after every intercepted call.
//!
//! This module provides:
//! - The [`Observer`] contract and the [`CallEnvelope`] it receives
//! - [`ObserverChain`], which runs observers in order and isolates failures
//! - Built-in observers for counting, recording and `tracing` output
//!
//! # Example
//!
//! ```rust,ignore
//! use dsproxy::observer::{CallEnvelope, Observer};
//!
//! struct SlowQueryAlert;
//!
//! impl Observer for SlowQueryAlert {
//!     fn on_after(&self, call: &CallEnvelope<'_>) {
//!         if call.elapsed.as_millis() > 500 {
//!             eprintln!("slow {} on {:?}: {:?}", call.method, call.connection_id(), call.query());
//!         }
//!     }
//! }
//! ```

mod chain;
mod observers;
mod tracing_observer;
mod types;


pub use chain::ObserverChain;
pub use observers::{
    CompositeObserver, CountObserver, NoopObserver, Phase, QueryCounts, RecordedCall,
    RecordingObserver,
};
pub use tracing_observer::TracingObserver;
pub use types::{CallEnvelope, CallResult, ExecutionRecord, Observer};
