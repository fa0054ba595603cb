use pretty_assertions::assert_eq;

use crate::{
    bson::{doc, Document},
    bson_util,
    error::{ErrorKind, Result, TRANSIENT_TRANSACTION_ERROR},
    operation::{
        BuildContext,
        Command,
        CommandErrorBody,
        Operation,
        OperationKind,
        OperationOutput,
        WriteResponseBody,
    },
    options::{Explain, ExplainVerbosity, ServerAddress},
    sdam::{ServerDescription, ServerType},
    Namespace,
};

/// The wire version of a 6.0 server.
pub(crate) const LATEST_WIRE_VERSION: i32 = 17;

pub(crate) fn description(max_wire_version: i32) -> ServerDescription {
    ServerDescription::builder()
        .address(ServerAddress::default())
        .server_type(ServerType::RsPrimary)
        .max_wire_version(max_wire_version)
        .build()
}

pub(crate) fn context(max_wire_version: i32) -> BuildContext {
    BuildContext {
        max_wire_version,
        in_transaction: false,
    }
}

pub(crate) fn build_test(op: &Operation) -> Command {
    op.build_command(&context(LATEST_WIRE_VERSION)).unwrap()
}

/// Asserts that the operation renders to the expected body, ignoring field order.
pub(crate) fn assert_body(op: &Operation, mut expected_body: Document) {
    let mut body = build_test(op).body;

    bson_util::sort_document(&mut expected_body);
    bson_util::sort_document(&mut body);

    assert_eq!(body, expected_body);
}

pub(crate) fn handle_response_test(op: &Operation, response: Document) -> Result<OperationOutput> {
    op.handle_response(response, &description(LATEST_WIRE_VERSION))
}

pub(crate) fn handle_response_test_with_wire_version(
    op: &Operation,
    response: Document,
    wire_version: i32,
) -> Result<OperationOutput> {
    op.handle_response(response, &description(wire_version))
}

pub(crate) fn test_ns() -> Namespace {
    Namespace::new("test_db", "test_coll")
}

#[test]
fn command_error_body_keeps_labels() {
    let body: CommandErrorBody = crate::bson::from_document(doc! {
        "ok": 0,
        "code": 251,
        "codeName": "NoSuchTransaction",
        "errmsg": "no such transaction",
        "errorLabels": [TRANSIENT_TRANSACTION_ERROR],
    })
    .unwrap();

    let error: crate::error::Error = body.into();
    assert!(error.contains_label(TRANSIENT_TRANSACTION_ERROR));
    assert_eq!(error.sdam_code(), Some(251));
}

#[test]
fn write_response_with_write_errors_fails() {
    let body: WriteResponseBody = crate::bson::from_document(doc! {
        "ok": 1,
        "n": 0,
        "writeErrors": [{ "index": 0, "code": 11000, "errmsg": "duplicate key" }],
    })
    .unwrap();

    let error = body.validate().unwrap_err();
    match *error.kind {
        ErrorKind::InsertMany(ref failure) => {
            let write_errors = failure.write_errors.as_ref().unwrap();
            assert_eq!(write_errors[0].code, 11000);
        }
        ref other => panic!("expected insert many error, got {other:?}"),
    }
}

#[test]
fn rendering_is_repeatable() {
    let ops = vec![
        Operation::find(test_ns(), doc! { "x": 1 }, None),
        Operation::insert_many(test_ns(), vec![doc! { "a": 1 }, doc! { "b": 2 }], None).unwrap(),
        Operation::update_one(test_ns(), doc! {}, doc! { "$set": { "x": 1 } }, None).unwrap(),
        Operation::aggregate(test_ns(), vec![doc! { "$match": {} }], None),
    ];

    for op in ops {
        assert_eq!(build_test(&op), build_test(&op));
    }
}

#[test]
fn explain_wraps_command() {
    let op = Operation::find(test_ns(), doc! { "x": 1 }, None)
        .with_explain(Explain::builder()
            .verbosity(ExplainVerbosity::ExecutionStats)
            .max_time(std::time::Duration::from_millis(50))
            .build())
        .unwrap();

    let command = build_test(&op);
    assert_eq!(command.name, "explain");
    assert_eq!(
        command.body,
        doc! {
            "explain": { "find": "test_coll", "filter": { "x": 1 } },
            "verbosity": "executionStats",
            "maxTimeMS": 50,
        }
    );

    let output = handle_response_test(&op, doc! { "ok": 1, "queryPlanner": {} }).unwrap();
    assert_eq!(output, OperationOutput::Command(doc! { "ok": 1, "queryPlanner": {} }));
}

#[test]
fn explain_rejected_for_unexplainable_kind() {
    let op = Operation::count(test_ns(), None, None);
    assert_eq!(op.kind(), OperationKind::Count);

    let error = op
        .with_explain(ExplainVerbosity::QueryPlanner)
        .unwrap_err();
    assert!(error.is_invalid_argument());
}

#[test]
fn kind_displays_command_name() {
    for kind in [
        OperationKind::Find,
        OperationKind::GetMore,
        OperationKind::FindAndModify,
        OperationKind::ListCollections,
        OperationKind::DropCollection,
    ] {
        assert_eq!(kind.to_string(), kind.command_name());
    }
    assert_eq!(OperationKind::DropCollection.to_string(), "drop");
}

#[test]
fn read_concern_omitted_in_transaction() {
    let op = Operation::find(
        test_ns(),
        None,
        crate::options::FindOptions::builder()
            .read_concern(crate::options::ReadConcern::majority())
            .build(),
    );

    let outside = op.build_command(&context(LATEST_WIRE_VERSION)).unwrap();
    assert_eq!(
        outside.body.get_document("readConcern").unwrap(),
        &doc! { "level": "majority" }
    );

    let inside = op
        .build_command(&BuildContext {
            max_wire_version: LATEST_WIRE_VERSION,
            in_transaction: true,
        })
        .unwrap();
    assert!(!inside.body.contains_key("readConcern"));
}

#[test]
fn write_concern_only_on_writes() {
    let mut client_options = crate::options::ClientOptions::default();
    client_options.write_concern = Some(crate::options::WriteConcern::majority());

    let mut find = Operation::find(test_ns(), None, None);
    find.inherit_concerns(&client_options);
    assert!(!build_test(&find).body.contains_key("writeConcern"));

    let mut delete = Operation::delete_one(test_ns(), doc! {}, None);
    delete.inherit_concerns(&client_options);
    assert_eq!(
        build_test(&delete).body.get_document("writeConcern").unwrap(),
        &doc! { "w": "majority" }
    );

    let in_transaction = delete
        .build_command(&BuildContext {
            max_wire_version: LATEST_WIRE_VERSION,
            in_transaction: true,
        })
        .unwrap();
    assert!(!in_transaction.body.contains_key("writeConcern"));
}

#[test]
fn invalid_write_concern_rejected() {
    let op = Operation::delete_one(
        test_ns(),
        doc! {},
        crate::options::DeleteOptions::builder()
            .write_concern(
                crate::options::WriteConcern::builder()
                    .w(crate::options::Acknowledgment::Nodes(0))
                    .journal(true)
                    .build(),
            )
            .build(),
    );
    assert!(op.validate().unwrap_err().is_invalid_argument());
}
