mod execution;
mod retryable_writes;

use crate::{
    bson::{doc, Document},
    error::{Error, ErrorKind},
    operation::CommandErrorBody,
    Namespace,
};

pub(crate) fn ns() -> Namespace {
    Namespace::new("test_db", "test_coll")
}

/// A successful reply establishing an exhausted cursor.
pub(crate) fn cursor_reply(batch: Vec<Document>) -> Document {
    doc! {
        "ok": 1,
        "cursor": { "id": 0i64, "ns": "test_db.test_coll", "firstBatch": batch },
    }
}

/// A failed reply with the given code and labels.
pub(crate) fn error_reply(code: i32, labels: &[&str]) -> Document {
    doc! {
        "ok": 0,
        "code": code,
        "codeName": "Failure",
        "errmsg": format!("failed with {code}"),
        "errorLabels": labels.to_vec(),
    }
}

pub(crate) fn command_code(error: &Error) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Command(e) => Some(e.code),
        _ => None,
    }
}

#[test]
fn error_reply_parses_as_command_error() {
    let body: CommandErrorBody = crate::bson::from_document(error_reply(91, &[])).unwrap();
    let error: Error = body.into();
    assert_eq!(command_code(&error), Some(91));
}
