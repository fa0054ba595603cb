use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::{
    bson::{doc, Bson},
    operation::{
        find::limit_and_batch_size,
        test::{assert_body, build_test, handle_response_test_with_wire_version, test_ns},
        Operation,
        OperationOutput,
    },
    options::{
        CursorType,
        FindOptions,
        Hint,
        ReadConcern,
        ReadConcernLevel,
        Sort,
        SortDirection,
    },
};

#[test]
fn build() {
    let filter = doc! {
        "x": 2,
        "y": { "$gt": 1 },
    };

    let options = FindOptions::builder()
        .hint(Hint::Keys(doc! { "x": 1, "y": 2 }))
        .projection(doc! { "x": 0 })
        .allow_partial_results(true)
        .read_concern(ReadConcern::from(ReadConcernLevel::Available))
        .build();

    let op = Operation::find(test_ns(), filter.clone(), options);

    let expected_body = doc! {
        "find": "test_coll",
        "filter": filter,
        "hint": {
            "x": 1,
            "y": 2,
        },
        "projection": {
            "x": 0
        },
        "allowPartialResults": true,
        "readConcern": {
            "level": "available"
        }
    };

    assert_body(&op, expected_body);
    assert_eq!(build_test(&op).target_db, "test_db");
}

#[test]
fn build_cursor_type() {
    let non_tailable_options = FindOptions::builder()
        .cursor_type(CursorType::NonTailable)
        .build();
    assert_body(
        &Operation::find(test_ns(), None, non_tailable_options),
        doc! { "find": "test_coll" },
    );

    let tailable_options = FindOptions::builder()
        .cursor_type(CursorType::Tailable)
        .build();
    assert_body(
        &Operation::find(test_ns(), None, tailable_options),
        doc! { "find": "test_coll", "tailable": true },
    );

    let tailable_await_options = FindOptions::builder()
        .cursor_type(CursorType::TailableAwait)
        .build();
    assert_body(
        &Operation::find(test_ns(), None, tailable_await_options),
        doc! { "find": "test_coll", "tailable": true, "awaitData": true },
    );
}

#[test]
fn build_max_await_time() {
    let options = FindOptions::builder()
        .max_await_time(Duration::from_millis(5))
        .max_time(Duration::from_millis(10))
        .build();

    assert_body(
        &Operation::find(test_ns(), None, options),
        doc! {
            "find": "test_coll",
            "maxTimeMS": 10i32
        },
    );
}

#[test]
fn negative_limit() {
    let options = FindOptions::builder().limit(-5i64).build();

    assert_body(
        &Operation::find(test_ns(), None, options),
        doc! {
            "find": "test_coll",
            "limit": 5i64,
            "singleBatch": true,
        },
    );
}

#[test]
fn negative_batch_size_without_limit() {
    let options = FindOptions::builder().batch_size(-3).build();

    assert_body(
        &Operation::find(test_ns(), None, options),
        doc! {
            "find": "test_coll",
            "singleBatch": true,
        },
    );
}

#[test]
fn limit_and_batch_size_interplay() {
    assert_eq!(limit_and_batch_size(Some(10), Some(-3)), (Some(3), None, true));
    assert_eq!(limit_and_batch_size(Some(2), Some(-3)), (Some(2), None, true));
    assert_eq!(limit_and_batch_size(Some(-10), Some(4)), (Some(10), Some(4), true));
    assert_eq!(limit_and_batch_size(Some(0), Some(4)), (None, Some(4), false));
    assert_eq!(limit_and_batch_size(None, None), (None, None, false));
}

#[test]
fn falsy_comment_is_kept() {
    for comment in [Bson::Boolean(false), Bson::Int32(0), Bson::String(String::new())] {
        let options = FindOptions::builder().comment(comment.clone()).build();
        let body = build_test(&Operation::find(test_ns(), None, options)).body;
        assert_eq!(body.get("comment"), Some(&comment));
    }

    let body = build_test(&Operation::find(test_ns(), None, None)).body;
    assert!(!body.contains_key("comment"));
}

#[test]
fn projection_from_field_names() {
    let options = FindOptions::builder()
        .projection(vec!["a", "b"])
        .build();
    let body = build_test(&Operation::find(test_ns(), None, options)).body;
    assert_eq!(body.get_document("projection").unwrap(), &doc! { "a": 1, "b": 1 });

    let options = FindOptions::builder()
        .projection(Vec::<String>::new())
        .build();
    let body = build_test(&Operation::find(test_ns(), None, options)).body;
    assert_eq!(body.get_document("projection").unwrap(), &doc! { "_id": 1 });
}

#[test]
fn sort_is_normalized() {
    let options = FindOptions::builder()
        .sort(doc! {
            "a": "asc",
            "b": "DESCENDING",
            "c": -1,
            "d": { "$meta": "textScore" },
        })
        .build();
    let body = build_test(&Operation::find(test_ns(), None, options)).body;
    assert_eq!(
        body.get_document("sort").unwrap(),
        &doc! { "a": 1, "b": -1, "c": -1, "d": { "$meta": "textScore" } }
    );

    let options = FindOptions::builder()
        .sort(vec![
            ("x".to_string(), SortDirection::Descending),
            ("y".to_string(), SortDirection::Ascending),
        ])
        .build();
    let body = build_test(&Operation::find(test_ns(), None, options)).body;
    assert_eq!(body.get_document("sort").unwrap(), &doc! { "x": -1, "y": 1 });

    let options = FindOptions::builder().sort(Sort::from("name")).build();
    let body = build_test(&Operation::find(test_ns(), None, options)).body;
    assert_eq!(body.get_document("sort").unwrap(), &doc! { "name": 1 });
}

#[test]
fn invalid_sort_direction() {
    let options = FindOptions::builder().sort(doc! { "a": "sideways" }).build();
    let error = Operation::find(test_ns(), None, options)
        .build_command(&crate::operation::test::context(17))
        .unwrap_err();
    assert!(error.is_invalid_argument());
}

#[test]
fn handle_success() {
    let options = FindOptions::builder()
        .batch_size(2)
        .max_await_time(Duration::from_millis(100))
        .comment("hello")
        .build();
    let op = Operation::find(test_ns(), None, options);

    let response = doc! {
        "ok": 1,
        "cursor": {
            "id": 123i64,
            "ns": "test_db.test_coll",
            "firstBatch": [{ "_id": 1 }, { "_id": 2 }],
        },
    };

    let OperationOutput::Cursor(spec) =
        handle_response_test_with_wire_version(&op, response.clone(), 17).unwrap()
    else {
        panic!("expected a cursor");
    };
    assert_eq!(spec.id(), 123);
    assert_eq!(spec.info.ns, test_ns());
    assert_eq!(spec.info.batch_size, Some(2));
    assert_eq!(spec.info.max_time, Some(Duration::from_millis(100)));
    assert_eq!(spec.info.comment, Some(Bson::String("hello".into())));
    assert_eq!(spec.initial_buffer.len(), 2);

    let OperationOutput::Cursor(spec) =
        handle_response_test_with_wire_version(&op, response, 8).unwrap()
    else {
        panic!("expected a cursor");
    };
    assert_eq!(spec.info.comment, None);
}

#[test]
fn handle_invalid_response() {
    let op = Operation::find(test_ns(), None, None);
    let result = handle_response_test_with_wire_version(&op, doc! { "ok": 1, "a": "b" }, 17);
    assert!(result.is_err());
}
