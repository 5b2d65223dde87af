//! Wrappers around driver objects.
//!
//! Each wrapper implements the same driver trait as the object it wraps, so it
//! can be used anywhere the real object was. Every call is routed through the
//! shared interceptor: query and parameter transformers run first, then the
//! observers get the before notification, the real call runs and the observers
//! get the after notification with the outcome. The real return value or error
//! is handed back untouched; objects returned by the driver come back wrapped
//! and share the connection's [`ConnectionInfo`](crate::ConnectionInfo).
//!
//! # Example
//!
//! ```rust,ignore
//! use dsproxy::{Connection, CountObserver, ProxyConfig, ProxyDataSource, Statement};
//! use dsproxy::DataSource;
//! use std::sync::Arc;
//!
//! let counter = Arc::new(CountObserver::new());
//! let config = ProxyConfig::new()
//!     .with_name("orders")
//!     .with_observer_arc(counter.clone());
//! let ds = ProxyDataSource::new(driver_data_source, config);
//!
//! let conn = ds.get_connection().await?;
//! let mut stmt = conn.create_statement().await?;
//! stmt.execute_update("UPDATE orders SET shipped = true").await?;
//! println!("{:?}", counter.stats());
//! ```

mod batch;
mod config;
mod connection;
mod data_source;
mod dispatch;
mod prepared;
mod result_set;
mod statement;


pub use batch::BatchTracker;
pub use config::ProxyConfig;
pub use connection::{ProxiedConnection, wrap_connection};
pub use data_source::ProxyDataSource;
pub use prepared::{ProxiedCallableStatement, ProxiedPreparedStatement};
pub use result_set::ProxiedResultSet;
pub use statement::ProxiedStatement;
