//! Contains the types describing server-side cursors created by operations.

use std::{collections::VecDeque, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::{
    bson::{Bson, Document},
    error::{Error, Result},
    options::ServerAddress,
    Namespace,
};

/// Specification used to iterate a cursor returned by a cursor-creating operation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct CursorSpecification {
    /// Static information about the cursor.
    pub info: CursorInformation,

    /// The documents returned in the first batch.
    pub initial_buffer: VecDeque<Document>,
}

impl CursorSpecification {
    pub(crate) fn from_reply(
        reply: Document,
        address: ServerAddress,
        batch_size: impl Into<Option<u32>>,
        max_time: impl Into<Option<Duration>>,
        comment: impl Into<Option<Bson>>,
    ) -> Result<Self> {
        let body: CursorBody = crate::bson::from_document(reply).map_err(|e| {
            Error::invalid_response(format!("invalid cursor response: {e}"))
        })?;
        Ok(Self {
            info: CursorInformation {
                ns: Namespace::from_str(&body.cursor.ns)?,
                address,
                id: body.cursor.id,
                batch_size: batch_size.into(),
                max_time: max_time.into(),
                comment: comment.into(),
            },
            initial_buffer: body.cursor.first_batch,
        })
    }

    /// The id of the server-side cursor. Zero when the results fit into the first batch.
    pub fn id(&self) -> i64 {
        self.info.id
    }
}

/// Static information about a cursor, needed to continue iterating it.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct CursorInformation {
    /// The namespace the cursor iterates.
    pub ns: Namespace,

    /// The server the cursor lives on. Follow-up commands must be sent to this server.
    pub address: ServerAddress,

    /// The server-side id of the cursor.
    pub id: i64,

    /// The batch size to request in each `getMore`.
    pub batch_size: Option<u32>,

    /// How long the server may wait for new documents in each `getMore`.
    pub max_time: Option<Duration>,

    /// The comment attached to the originating operation.
    pub comment: Option<Bson>,
}

#[derive(Debug, Deserialize)]
struct CursorBody {
    cursor: CursorInfoBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorInfoBody {
    id: i64,
    ns: String,
    first_batch: VecDeque<Document>,
}
