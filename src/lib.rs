//! Lifecycle engine for electronic invoices kept on a key/value ledger.
//!
//! Each invoice is one JSON aggregate plus one verbatim document body. The
//! [`service::InvoiceService`] loads the aggregate, checks the requested
//! transition against its history and writes the new snapshot back.
//! [`dispatch::Dispatcher`] maps ledger function names onto those operations.

pub mod authority;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoice;
pub mod payload;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod types;
