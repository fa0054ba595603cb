//! This crate contains the command-execution core of a MongoDB client: it turns logical database
//! operations into wire command documents, selects a server to run them on, and retries them once
//! under the conditions laid out by the retryable reads and retryable writes rules while keeping
//! session and transaction state consistent. It uses the [`bson`] crate for BSON support.
//!
//! Topology monitoring, connection pooling and the byte-level wire protocol are provided by the
//! embedding driver through the [`Topology`](sdam::Topology), [`Server`](sdam::Server) and
//! [`TopologyConnector`](sdam::TopologyConnector) traits.
//!
//! # Example Usage
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use mongodb_executor::{sdam::TopologyConnector, error::Result};
//! use mongodb_executor::{
//!     bson::doc,
//!     operation::Operation,
//!     options::{ClientOptions, FindOptions},
//!     Client,
//!     Namespace,
//! };
//!
//! # async fn run(connector: impl TopologyConnector + 'static) -> Result<()> {
//! let client = Client::with_connector(connector, ClientOptions::default());
//! let ns = Namespace::new("app", "users");
//! let find = Operation::find(
//!     ns,
//!     doc! { "age": { "$gt": 21 } },
//!     FindOptions::builder().limit(10i64).build(),
//! );
//! let output = client.execute(find, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Command, server selection and retry events are emitted through [`tracing`] under the
//! `mongodb_executor::command`, `mongodb_executor::server_selection` and
//! `mongodb_executor::operation` targets.

#![warn(missing_docs)]
#![warn(clippy::cast_possible_truncation)]
#![warn(clippy::cast_possible_wrap)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use bson;

mod bson_util;
mod client;
mod collation;
pub mod concern;
pub mod cursor;
pub mod error;
mod namespace;
pub mod operation;
pub mod options;
pub mod results;
pub mod retry;
pub mod sdam;
mod selection_criteria;
mod serde_util;
#[cfg(test)]
mod test;
mod trace;

pub use crate::{
    client::{session::ClientSession, Client},
    namespace::Namespace,
};

pub use {client::session::UnpinOptions, operation::OperationOutput};

pub use futures_core::future::BoxFuture;
