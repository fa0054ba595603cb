use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::{
    bson::doc,
    collation::Collation,
    concern::WriteConcern,
    error::{ErrorKind, WriteFailure},
    operation::{
        test::{assert_body, context, handle_response_test, test_ns},
        Operation,
        OperationOutput,
    },
    options::{
        FindOneAndDeleteOptions,
        FindOneAndReplaceOptions,
        FindOneAndUpdateOptions,
        Hint,
        ReturnDocument,
    },
    retry::Retryability,
};

#[test]
fn build_delete() {
    let options = FindOneAndDeleteOptions::builder()
        .max_time(Duration::from_millis(500))
        .projection(doc! { "x": 1 })
        .sort(doc! { "x": -1 })
        .collation(Collation::builder().locale("en").build())
        .build();
    let op = Operation::find_one_and_delete(test_ns(), doc! { "x": { "$gt": 1 } }, options);

    assert_body(
        &op,
        doc! {
            "findAndModify": "test_coll",
            "query": { "x": { "$gt": 1 } },
            "remove": true,
            "sort": { "x": -1 },
            "fields": { "x": 1 },
            "maxTimeMS": 500,
            "collation": { "locale": "en" },
        },
    );
    assert_eq!(op.retryability(), Retryability::Write);
}

#[test]
fn build_update() {
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .upsert(true)
        .array_filters(vec![doc! { "e.y": 2 }])
        .let_vars(doc! { "v": 1 })
        .comment("tagged")
        .build();
    let op = Operation::find_one_and_update(
        test_ns(),
        doc! { "_id": 1 },
        doc! { "$set": { "e.$[e].y": "$$v" } },
        options,
    )
    .unwrap();

    assert_body(
        &op,
        doc! {
            "findAndModify": "test_coll",
            "query": { "_id": 1 },
            "update": { "$set": { "e.$[e].y": "$$v" } },
            "new": true,
            "upsert": true,
            "arrayFilters": [{ "e.y": 2 }],
            "let": { "v": 1 },
            "comment": "tagged",
        },
    );
}

#[test]
fn build_replace() {
    let options = FindOneAndReplaceOptions::builder()
        .return_document(ReturnDocument::Before)
        .bypass_document_validation(true)
        .build();
    let op = Operation::find_one_and_replace(test_ns(), doc! { "_id": 1 }, &doc! { "y": 1 }, options)
        .unwrap();

    assert_body(
        &op,
        doc! {
            "findAndModify": "test_coll",
            "query": { "_id": 1 },
            "update": { "y": 1 },
            "new": false,
            "bypassDocumentValidation": true,
        },
    );
}

#[test]
fn invalid_documents_rejected() {
    let error =
        Operation::find_one_and_update(test_ns(), doc! {}, doc! { "x": 1 }, None).unwrap_err();
    assert!(error.is_invalid_argument());

    let error = Operation::find_one_and_replace(test_ns(), doc! {}, &doc! { "$inc": { "x": 1 } }, None)
        .unwrap_err();
    assert!(error.is_invalid_argument());
}

#[test]
fn mixed_keys_rejected() {
    let error = Operation::find_one_and_update(
        test_ns(),
        doc! {},
        doc! { "$set": { "a": 1 }, "name": "x" },
        None,
    )
    .unwrap_err();
    assert!(error.is_invalid_argument());

    let error = Operation::find_one_and_replace(
        test_ns(),
        doc! {},
        &doc! { "name": "x", "$inc": { "n": 1 } },
        None,
    )
    .unwrap_err();
    assert!(error.is_invalid_argument());
}

#[test]
fn hint_requires_recent_server() {
    let options = FindOneAndDeleteOptions::builder()
        .hint(Hint::Name("x_1".to_string()))
        .build();
    let op = Operation::find_one_and_delete(test_ns(), doc! {}, options);

    let error = op.build_command(&context(7)).unwrap_err();
    assert!(error.is_incompatible_server());

    let command = op.build_command(&context(8)).unwrap();
    assert_eq!(command.body.get_str("hint").unwrap(), "x_1");
}

#[test]
fn hint_with_unacknowledged_write_rejected() {
    let options = FindOneAndDeleteOptions::builder()
        .hint(Hint::Name("x_1".to_string()))
        .write_concern(WriteConcern::unacknowledged())
        .build();
    let op = Operation::find_one_and_delete(test_ns(), doc! {}, options);
    assert!(op.validate().unwrap_err().is_incompatible_server());
}

#[test]
fn handle_success() {
    let op = Operation::find_one_and_delete(test_ns(), doc! {}, None);

    let output = handle_response_test(
        &op,
        doc! {
            "ok": 1,
            "lastErrorObject": { "n": 1 },
            "value": { "_id": 1, "x": 2 },
        },
    )
    .unwrap();
    assert_eq!(
        output,
        OperationOutput::FindAndModify(Some(doc! { "_id": 1, "x": 2 }))
    );
}

#[test]
fn handle_no_match() {
    let op = Operation::find_one_and_delete(test_ns(), doc! {}, None);

    let output = handle_response_test(
        &op,
        doc! { "ok": 1, "lastErrorObject": { "n": 0 }, "value": null },
    )
    .unwrap();
    assert_eq!(output, OperationOutput::FindAndModify(None));
}

#[test]
fn handle_write_concern_error() {
    let op = Operation::find_one_and_delete(test_ns(), doc! {}, None);

    let error = handle_response_test(
        &op,
        doc! {
            "ok": 1,
            "value": null,
            "writeConcernError": { "code": 100, "errmsg": "unsatisfiable" },
        },
    )
    .unwrap_err();
    assert!(matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteConcernError(ref e)) if e.code == 100
    ));
}
