use pretty_assertions::assert_eq;

use crate::{
    bson::{doc, Bson},
    cursor::CursorInformation,
    error::{ErrorKind, RETRYABLE_WRITE_ERROR},
    operation::{Operation, OperationOutput},
    options::{
        AggregateOptions,
        ClientOptions,
        DeleteOptions,
        ExplainVerbosity,
        FindOptions,
        Hint,
        ReadPreference,
        ServerSelector,
        SessionOptions,
        WriteConcern,
    },
    test::{
        command_code,
        cursor_reply,
        error_reply,
        mock::{address, MockTopology},
        ns,
    },
};

#[tokio::test]
async fn connects_once() {
    let topology = MockTopology::replica_set();
    topology.reply(cursor_reply(vec![])).reply(cursor_reply(vec![]));
    let client = topology.client();

    client.connect().await.unwrap();
    client.execute(Operation::find(ns(), None, None), None).await.unwrap();
    client.execute(Operation::find(ns(), None, None), None).await.unwrap();

    assert_eq!(topology.connects(), 1);
}

#[tokio::test]
async fn closed_client_rejects_operations() {
    let topology = MockTopology::replica_set();
    let client = topology.client();
    client.connect().await.unwrap();
    client.close().await;

    let error = client
        .execute(Operation::find(ns(), None, None), None)
        .await
        .unwrap_err();
    assert!(matches!(*error.kind, ErrorKind::NotConnected));
    assert!(topology.dispatched().is_empty());
}

#[tokio::test]
async fn non_retryable_kind_dispatches_once() {
    let topology = MockTopology::replica_set();
    topology.reply(error_reply(91, &[RETRYABLE_WRITE_ERROR]));
    let client = topology.client();

    let update_many =
        Operation::update_many(ns(), doc! {}, doc! { "$set": { "x": 1 } }, None).unwrap();
    let error = client.execute(update_many, None).await.unwrap_err();

    assert_eq!(command_code(&error), Some(91));
    assert_eq!(topology.dispatched().len(), 1);
    assert_eq!(topology.selections().len(), 1);
    assert!(!topology.commands()[0].contains_key("txnNumber"));
}

#[tokio::test]
async fn hinted_unacknowledged_delete_rejected_before_dispatch() {
    let topology = MockTopology::replica_set();
    let client = topology.client();

    let options = DeleteOptions::builder()
        .hint(Hint::Name("x_1".to_string()))
        .write_concern(WriteConcern::unacknowledged())
        .build();
    let error = client
        .execute(Operation::delete_one(ns(), doc! {}, options), None)
        .await
        .unwrap_err();

    assert!(error.is_incompatible_server());
    assert!(topology.selections().is_empty());
    assert!(topology.dispatched().is_empty());
}

#[tokio::test]
async fn get_more_on_another_server_not_dispatched() {
    let topology = MockTopology::replica_set().misrouting();
    let client = topology.client();

    let info = CursorInformation {
        ns: ns(),
        address: address(27018),
        id: 42,
        batch_size: None,
        max_time: None,
        comment: None,
    };
    let error = client
        .execute(Operation::get_more(info).unwrap(), None)
        .await
        .unwrap_err();

    assert!(matches!(*error.kind, ErrorKind::Internal { .. }));
    assert_eq!(
        topology.selections()[0].0,
        ServerSelector::SameServer(address(27018))
    );
    assert!(topology.dispatched().is_empty());
}

#[tokio::test]
async fn get_more_runs_on_cursor_server() {
    let topology = MockTopology::replica_set();
    topology.reply(doc! {
        "ok": 1,
        "cursor": { "id": 0i64, "ns": "test_db.test_coll", "nextBatch": [{ "x": 1 }] },
    });
    let client = topology.client();

    let info = CursorInformation {
        ns: ns(),
        address: address(27018),
        id: 42,
        batch_size: Some(5),
        max_time: None,
        comment: None,
    };
    client
        .execute(Operation::get_more(info).unwrap(), None)
        .await
        .unwrap();

    let dispatched = topology.dispatched();
    assert_eq!(dispatched[0].address, address(27018));
    assert_eq!(dispatched[0].command.body.get_i64("getMore").unwrap(), 42);
}

#[tokio::test]
async fn implicit_session_attached_and_reused() {
    let topology = MockTopology::replica_set();
    topology.reply(cursor_reply(vec![])).reply(cursor_reply(vec![]));
    let client = topology.client();

    client.execute(Operation::find(ns(), None, None), None).await.unwrap();
    assert_eq!(client.session_pool().len(), 1);
    client.execute(Operation::find(ns(), None, None), None).await.unwrap();
    assert_eq!(client.session_pool().len(), 1);

    let commands = topology.commands();
    let first = commands[0].get_document("lsid").unwrap();
    let second = commands[1].get_document("lsid").unwrap();
    assert_eq!(first, second);
    assert!(client.session_pool().contains(first));
}

#[tokio::test]
async fn no_implicit_session_for_unacknowledged_writes() {
    let topology = MockTopology::replica_set();
    topology.reply(doc! { "ok": 1 });
    let client = topology.client_with_options(
        ClientOptions::builder()
            .write_concern(WriteConcern::unacknowledged())
            .build(),
    );

    let insert = Operation::insert_one(ns(), &doc! { "_id": 1 }, None).unwrap();
    client.execute(insert, None).await.unwrap();

    let command = &topology.commands()[0];
    assert!(!command.contains_key("lsid"));
    assert!(!command.contains_key("txnNumber"));
    assert_eq!(
        command.get_document("writeConcern").unwrap(),
        &doc! { "w": 0 }
    );
}

#[tokio::test]
async fn no_session_support_means_no_retry() {
    let topology = MockTopology::replica_set().without_sessions();
    topology.fail(crate::error::Error::network_timeout());
    let client = topology.client();

    let error = client
        .execute(Operation::find(ns(), None, None), None)
        .await
        .unwrap_err();

    assert!(error.is_network_error());
    assert_eq!(topology.dispatched().len(), 1);
    assert!(!topology.commands()[0].contains_key("lsid"));
}

#[tokio::test]
async fn ended_session_rejected() {
    let topology = MockTopology::replica_set();
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();
    session.end_session();

    let error = client
        .execute(Operation::find(ns(), None, None), Some(&mut session))
        .await
        .unwrap_err();
    assert!(matches!(*error.kind, ErrorKind::ExpiredSession));
    assert!(topology.dispatched().is_empty());
}

#[tokio::test]
async fn session_from_another_client_rejected() {
    let topology = MockTopology::replica_set();
    let client = topology.client();
    let other = topology.client();
    let mut session = other.start_session(None).await.unwrap();

    let error = client
        .execute(Operation::find(ns(), None, None), Some(&mut session))
        .await
        .unwrap_err();
    assert!(matches!(*error.kind, ErrorKind::SessionOwnershipMismatch));
}

#[tokio::test]
async fn snapshot_session_requires_support() {
    let topology = MockTopology::replica_set().without_snapshot_reads();
    let client = topology.client();
    let mut session = client
        .start_session(SessionOptions::builder().snapshot(true).build())
        .await
        .unwrap();

    let error = client
        .execute(Operation::find(ns(), None, None), Some(&mut session))
        .await
        .unwrap_err();
    assert!(error.is_incompatible_server());
}

#[tokio::test]
async fn explicit_session_with_unacknowledged_write_rejected() {
    let topology = MockTopology::replica_set();
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();

    let options = DeleteOptions::builder()
        .write_concern(WriteConcern::unacknowledged())
        .build();
    let error = client
        .execute(
            Operation::delete_one(ns(), doc! {}, options),
            Some(&mut session),
        )
        .await
        .unwrap_err();
    assert!(error.is_invalid_argument());
}

#[tokio::test]
async fn explicit_session_lsid_sent() {
    let topology = MockTopology::replica_set();
    topology.reply(cursor_reply(vec![doc! { "x": 1 }]));
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();

    let output = client
        .execute(Operation::find(ns(), None, None), Some(&mut session))
        .await
        .unwrap();

    assert_eq!(
        topology.commands()[0].get_document("lsid").unwrap(),
        session.id()
    );
    match output {
        OperationOutput::Cursor(spec) => {
            assert_eq!(spec.info.address, address(27017));
            assert_eq!(spec.initial_buffer.len(), 1);
        }
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn read_preference_forwarded_to_server() {
    let topology = MockTopology::replica_set();
    topology.reply(cursor_reply(vec![]));
    let client = topology.client();

    let secondary = ReadPreference::Secondary { options: None };
    let options = FindOptions::builder()
        .read_preference(secondary.clone())
        .build();
    client
        .execute(Operation::find(ns(), None, options), None)
        .await
        .unwrap();

    assert_eq!(
        topology.selections()[0].0,
        ServerSelector::ReadPreference(secondary.clone())
    );
    assert_eq!(topology.dispatched()[0].options.read_preference, Some(secondary));
}

#[tokio::test]
async fn write_stage_aggregate_uses_secondary_writable_selector() {
    let topology = MockTopology::replica_set_with_wire_version(13);
    topology.reply(cursor_reply(vec![]));
    let client = topology.client();

    let secondary = ReadPreference::Secondary { options: None };
    let options = AggregateOptions::builder()
        .read_preference(secondary.clone())
        .build();
    let aggregate = Operation::aggregate(ns(), [doc! { "$out": "other" }], options);
    client.execute(aggregate, None).await.unwrap();

    assert_eq!(
        topology.selections()[0].0,
        ServerSelector::SecondaryWritable {
            read_preference: secondary,
            common_wire_version: Some(13),
        }
    );
}

#[tokio::test]
async fn failed_reply_becomes_command_error() {
    let topology = MockTopology::replica_set();
    topology.reply(error_reply(2, &["SomeLabel"]));
    let client = topology.client();

    let error = client
        .execute(Operation::count(ns(), None, None), None)
        .await
        .unwrap_err();

    assert_eq!(command_code(&error), Some(2));
    assert!(error.contains_label("SomeLabel"));
    assert_eq!(error.wire_version(), Some(17));
}

#[tokio::test]
async fn kill_cursors_failures_swallowed() {
    let topology = MockTopology::replica_set();
    topology.fail(crate::error::Error::network_timeout());
    let client = topology.client();

    let info = CursorInformation {
        ns: ns(),
        address: address(27017),
        id: 7,
        batch_size: None,
        max_time: None,
        comment: None,
    };
    let output = client
        .execute(Operation::kill_cursors(&info), None)
        .await
        .unwrap();

    assert_eq!(output, OperationOutput::Unit);
    assert_eq!(topology.dispatched().len(), 1);
}

#[tokio::test]
async fn explain_returns_raw_reply() {
    let topology = MockTopology::replica_set();
    let reply = doc! { "ok": 1, "queryPlanner": { "winningPlan": { "stage": "COLLSCAN" } } };
    topology.reply(reply.clone());
    let client = topology.client();

    let find = Operation::find(ns(), doc! { "x": 1 }, None)
        .with_explain(ExplainVerbosity::QueryPlanner)
        .unwrap();
    let output = client.execute(find, None).await.unwrap();

    assert_eq!(output, OperationOutput::Command(reply));
    let command = &topology.dispatched()[0].command;
    assert_eq!(command.name, "explain");
    assert_eq!(command.body.get_str("verbosity").unwrap(), "queryPlanner");
}

#[tokio::test]
async fn client_write_concern_inherited() {
    let topology = MockTopology::replica_set();
    topology.reply(doc! { "ok": 1, "n": 1 });
    let client = topology.client_with_options(
        ClientOptions::builder()
            .write_concern(WriteConcern::majority())
            .build(),
    );

    let insert = Operation::insert_one(ns(), &doc! { "_id": 1 }, None).unwrap();
    let output = client.execute(insert, None).await.unwrap();

    assert_eq!(
        topology.commands()[0].get_document("writeConcern").unwrap(),
        &doc! { "w": "majority" }
    );
    match output {
        OperationOutput::InsertOne(result) => assert_eq!(result.inserted_id, Bson::Int32(1)),
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn network_error_on_pinned_find_reselects_freely() {
    let topology = MockTopology::sharded();
    topology
        .fail(crate::error::Error::network_timeout())
        .reply(cursor_reply(vec![]));
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();
    session.pin_mongos(address(27018));

    client
        .execute(Operation::find(ns(), None, None), Some(&mut session))
        .await
        .unwrap();

    assert!(!session.is_pinned());
    let selections = topology.selections();
    assert_eq!(selections.len(), 2);
    assert_eq!(selections[0].0, ServerSelector::SameServer(address(27018)));
    assert!(matches!(selections[1].0, ServerSelector::ReadPreference(_)));

    let dispatched = topology.dispatched();
    assert_eq!(dispatched[0].address, address(27018));
    assert_eq!(dispatched[1].address, address(27017));
}
