use pretty_assertions::assert_eq;

use crate::{
    bson::{doc, Bson},
    error::{Error, ErrorKind, NO_WRITES_PERFORMED, RETRYABLE_WRITE_ERROR},
    operation::Operation,
    options::ClientOptions,
    sdam::{ServerDescription, ServerType},
    test::{
        command_code,
        error_reply,
        mock::{address, MockTopology, LOGICAL_SESSION_TIMEOUT},
        ns,
    },
    OperationOutput,
};

fn insert() -> Operation {
    Operation::insert_one(ns(), &doc! { "_id": 1, "x": 1 }, None).unwrap()
}

#[tokio::test]
async fn network_error_retried_with_same_txn_number() {
    let topology = MockTopology::replica_set();
    topology
        .fail(Error::network_timeout())
        .reply(doc! { "ok": 1, "n": 1 });
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();

    let output = client.execute(insert(), Some(&mut session)).await.unwrap();

    let OperationOutput::InsertOne(result) = output else {
        panic!("expected an insert result, got {output:?}");
    };
    assert_eq!(result.inserted_id, Bson::Int32(1));
    assert_eq!(session.txn_number(), 1);

    let commands = topology.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0], commands[1]);
    assert_eq!(commands[0].get_i64("txnNumber").unwrap(), 1);
    assert_eq!(commands[0].get_document("lsid").unwrap(), session.id());

    let selections = topology.selections();
    assert_eq!(selections[1].1.deprioritized, Some(address(27017)));
}

#[tokio::test]
async fn each_write_takes_a_new_txn_number() {
    let topology = MockTopology::replica_set();
    topology
        .reply(doc! { "ok": 1, "n": 1 })
        .reply(doc! { "ok": 1, "n": 1 });
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();

    client.execute(insert(), Some(&mut session)).await.unwrap();
    client.execute(insert(), Some(&mut session)).await.unwrap();

    let txn_numbers: Vec<_> = topology
        .commands()
        .iter()
        .map(|c| c.get_i64("txnNumber").unwrap())
        .collect();
    assert_eq!(txn_numbers, vec![1, 2]);
}

#[tokio::test]
async fn labelled_command_error_retried() {
    let topology = MockTopology::replica_set();
    topology
        .reply(error_reply(189, &[RETRYABLE_WRITE_ERROR]))
        .reply(doc! { "ok": 1, "n": 1, "nModified": 1 });
    let client = topology.client();

    client
        .execute(
            Operation::update_one(ns(), doc! { "_id": 1 }, doc! { "$set": { "x": 2 } }, None)
                .unwrap(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(topology.dispatched().len(), 2);
}

#[tokio::test]
async fn unlabelled_command_error_not_retried() {
    let topology = MockTopology::replica_set();
    topology.reply(error_reply(91, &[]));
    let client = topology.client();

    let error = client.execute(insert(), None).await.unwrap_err();

    assert_eq!(command_code(&error), Some(91));
    assert!(!error.contains_label(RETRYABLE_WRITE_ERROR));
    assert_eq!(topology.dispatched().len(), 1);
}

#[tokio::test]
async fn no_writes_performed_surfaces_first_error() {
    let topology = MockTopology::replica_set();
    topology
        .reply(error_reply(91, &[RETRYABLE_WRITE_ERROR]))
        .reply(error_reply(10107, &[RETRYABLE_WRITE_ERROR, NO_WRITES_PERFORMED]));
    let client = topology.client();

    let error = client.execute(insert(), None).await.unwrap_err();

    assert_eq!(command_code(&error), Some(91));
    assert_eq!(topology.dispatched().len(), 2);
}

#[tokio::test]
async fn second_failure_surfaces_new_error() {
    let topology = MockTopology::replica_set();
    topology
        .reply(error_reply(91, &[RETRYABLE_WRITE_ERROR]))
        .reply(error_reply(10107, &[RETRYABLE_WRITE_ERROR]));
    let client = topology.client();

    let error = client.execute(insert(), None).await.unwrap_err();

    assert_eq!(command_code(&error), Some(10107));
    assert_eq!(topology.dispatched().len(), 2);
}

#[tokio::test]
async fn standalone_writes_not_retried() {
    let topology = MockTopology::standalone();
    topology.fail(Error::network_timeout());
    let client = topology.client();

    let error = client.execute(insert(), None).await.unwrap_err();

    assert!(error.is_network_error());
    let commands = topology.commands();
    assert_eq!(commands.len(), 1);
    assert!(!commands[0].contains_key("txnNumber"));
}

#[tokio::test]
async fn retry_on_server_without_retryable_writes_fails() {
    let old_mongos = ServerDescription::builder()
        .address(address(27018))
        .server_type(ServerType::Mongos)
        .max_wire_version(5)
        .logical_session_timeout(LOGICAL_SESSION_TIMEOUT)
        .build();
    let topology = MockTopology::sharded().with_server(old_mongos);
    topology.fail(Error::network_timeout());
    let client = topology.client();

    let error = client.execute(insert(), None).await.unwrap_err();

    let ErrorKind::UnexpectedServerResponse { ref message } = *error.kind else {
        panic!("expected an unexpected server response error, got {error:?}");
    };
    assert!(message.contains("Kind: "), "{message}");
    assert_eq!(topology.dispatched().len(), 1);
}

#[tokio::test]
async fn legacy_storage_engine_error_not_retried() {
    let topology = MockTopology::replica_set();
    topology.reply(doc! {
        "ok": 0,
        "code": 20,
        "codeName": "IllegalOperation",
        "errmsg": "Transaction numbers are only allowed on a replica set member or mongos",
        "errorLabels": [RETRYABLE_WRITE_ERROR],
    });
    let client = topology.client();

    let error = client.execute(insert(), None).await.unwrap_err();

    assert!(error.is_incompatible_server());
    assert_eq!(error.source_error().and_then(|e| e.sdam_code()), Some(20));
    assert_eq!(topology.dispatched().len(), 1);
}

#[tokio::test]
async fn disabled_by_client_options() {
    let topology = MockTopology::replica_set();
    topology.fail(Error::network_timeout());
    let client =
        topology.client_with_options(ClientOptions::builder().retry_writes(false).build());

    let error = client.execute(insert(), None).await.unwrap_err();

    assert!(error.is_network_error());
    let commands = topology.commands();
    assert_eq!(commands.len(), 1);
    assert!(!commands[0].contains_key("txnNumber"));
    assert!(commands[0].contains_key("lsid"));
}

#[tokio::test]
async fn old_server_codes_get_labelled() {
    let topology = MockTopology::replica_set_with_wire_version(8);
    topology
        .reply(error_reply(91, &[]))
        .reply(doc! { "ok": 1, "n": 1 });
    let client = topology.client();

    client.execute(insert(), None).await.unwrap();

    assert_eq!(topology.dispatched().len(), 2);
}

#[tokio::test]
async fn network_error_marks_session_dirty() {
    let topology = MockTopology::replica_set();
    topology
        .fail(Error::network_timeout())
        .reply(doc! { "ok": 1, "n": 1 });
    let client = topology.client();
    let mut session = client.start_session(None).await.unwrap();
    let id = session.id().clone();

    client.execute(insert(), Some(&mut session)).await.unwrap();
    assert!(session.is_dirty());

    session.end_session();
    assert!(!client.session_pool().contains(&id));
}

#[tokio::test]
async fn retried_find_and_modify_returns_document() {
    let topology = MockTopology::replica_set();
    topology
        .reply(error_reply(11600, &[RETRYABLE_WRITE_ERROR]))
        .reply(doc! { "ok": 1, "value": { "_id": 1, "x": 1 } });
    let client = topology.client();

    let output = client
        .execute(
            Operation::find_one_and_delete(ns(), doc! { "_id": 1 }, None),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        output,
        OperationOutput::FindAndModify(Some(doc! { "_id": 1, "x": 1 }))
    );
    let commands = topology.commands();
    assert_eq!(
        commands[0].get_i64("txnNumber").ok(),
        commands[1].get_i64("txnNumber").ok()
    );
}
