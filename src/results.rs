//! Contains the types of results returned by operations.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::bson::{Bson, Document};

/// The result of an `insertOne` operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InsertOneResult {
    /// The `_id` field of the document inserted.
    pub inserted_id: Bson,
}

impl InsertOneResult {
    pub(crate) fn from_insert_many_result(result: InsertManyResult) -> Self {
        Self {
            inserted_id: result.inserted_ids.get(&0).cloned().unwrap_or(Bson::Null),
        }
    }
}

/// The result of an `insertMany` operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InsertManyResult {
    /// The `_id` field of the documents inserted, keyed by their position in the input.
    pub inserted_ids: HashMap<usize, Bson>,
}

/// The result of an update or replace operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UpdateResult {
    /// The number of documents that matched the filter.
    pub matched_count: u64,
    /// The number of documents that were modified by the operation.
    pub modified_count: u64,
    /// The `_id` field of the upserted document.
    pub upserted_id: Option<Bson>,
}

/// The result of a delete operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DeleteResult {
    /// The number of documents deleted by the operation.
    pub deleted_count: u64,
}

/// The result of a `getMore`.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct GetMoreResult {
    /// The documents in the returned batch.
    pub batch: VecDeque<Document>,

    /// Whether the server closed the cursor after this batch.
    pub exhausted: bool,

    /// The id of the cursor; zero once exhausted.
    pub id: i64,
}
