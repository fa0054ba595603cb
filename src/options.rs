//! Contains all of the types needed to specify options to operations, clients and sessions.
//!
//! Most of the options structs in this module use the
//! [`typed-builder`](https://crates.io/crates/typed-builder) crate to derive a type-safe builder
//! API on them. For example, to create an instance of
//! [`FindOptions`](struct.FindOptions.html) with only `limit` and `batch_size` set, the builder
//! API can be used as follows:
//!
//! ```rust
//! # use mongodb_executor::options::FindOptions;
//! #
//! # let options = FindOptions::builder()
//! #                   .limit(20)
//! #                   .batch_size(5)
//! #                   .build();
//! ```

pub use crate::{
    client::options::*,
    collation::*,
    concern::*,
    operation::options::*,
    selection_criteria::*,
};
