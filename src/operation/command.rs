use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    bson::{doc, Bson, Document},
    concern::{ReadConcern, WriteConcern},
    error::Result,
    operation::options::Explain,
    ClientSession,
};

/// A database command ready to be sent to a server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Command {
    /// The name of the command.
    pub name: String,

    /// The database the command runs against.
    pub target_db: String,

    /// The command document. Its first key is the command name.
    pub body: Document,
}

impl Command {
    pub(crate) fn new(name: impl ToString, target_db: impl ToString, body: Document) -> Self {
        Self {
            name: name.to_string(),
            target_db: target_db.to_string(),
            body,
        }
    }

    pub(crate) fn set_session(&mut self, session: &ClientSession) {
        self.body.insert("lsid", session.id().clone());
    }

    pub(crate) fn set_txn_number(&mut self, txn_number: i64) {
        self.body.insert("txnNumber", txn_number);
    }

    pub(crate) fn set_start_transaction(&mut self) {
        self.body.insert("startTransaction", true);
    }

    pub(crate) fn set_autocommit(&mut self) {
        self.body.insert("autocommit", false);
    }

    pub(crate) fn set_collation(&mut self, collation: Document) {
        self.body.insert("collation", collation);
    }

    pub(crate) fn set_read_concern(&mut self, read_concern: &ReadConcern) -> Result<()> {
        self.body.insert("readConcern", read_concern.to_document()?);
        Ok(())
    }

    pub(crate) fn set_write_concern(&mut self, write_concern: &WriteConcern) -> Result<()> {
        if !write_concern.is_empty() {
            self.body
                .insert("writeConcern", write_concern.to_document()?);
        }
        Ok(())
    }

    /// Replaces the command with an `explain` wrapping it.
    pub(crate) fn wrap_in_explain(&mut self, explain: &Explain) {
        let inner = std::mem::take(&mut self.body);
        let mut body = doc! {
            "explain": inner,
            "verbosity": explain.verbosity.as_str(),
        };
        if let Some(max_time) = explain.max_time {
            body.insert("maxTimeMS", duration_as_millis(max_time));
        }
        self.name = "explain".to_string();
        self.body = body;
    }
}

/// Renders a duration the way the server expects millisecond fields, as an `Int32` when it fits.
pub(crate) fn duration_as_millis(duration: Duration) -> Bson {
    match i32::try_from(duration.as_millis()) {
        Ok(millis) => Bson::Int32(millis),
        Err(_) => Bson::Int64(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)),
    }
}
