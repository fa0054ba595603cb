use crate::{
    bson::doc,
    error::{
        convert_insert_many_error,
        Error,
        ErrorKind,
        WriteFailure,
        RETRYABLE_WRITE_ERROR,
    },
    operation::CommandErrorBody,
    sdam::ServerType,
};

fn command_error(code: i32) -> Error {
    let body: CommandErrorBody = crate::bson::from_document(doc! {
        "ok": 0,
        "code": code,
        "codeName": "Failure",
        "errmsg": "command failed",
    })
    .unwrap();
    body.into()
}

#[test]
fn display_starts_with_kind() {
    let error = Error::invalid_argument("bad input");
    let display = error.to_string();
    let kind = display.split(',').next().unwrap();
    assert_eq!(kind, "Kind: An invalid argument was provided: bad input");
}

#[test]
fn network_errors_get_retryable_write_label() {
    let error = Error::network_timeout();
    assert!(error.is_network_error());
    assert!(error.should_add_retryable_write_label(17, Some(ServerType::RsPrimary)));
    assert!(error.should_add_retryable_write_label(8, Some(ServerType::RsPrimary)));
}

#[test]
fn retryable_codes_labelled_only_on_old_servers() {
    let error = command_error(91);
    assert!(error.should_add_retryable_write_label(8, Some(ServerType::RsPrimary)));
    assert!(!error.should_add_retryable_write_label(9, Some(ServerType::RsPrimary)));

    let error = command_error(2);
    assert!(!error.should_add_retryable_write_label(8, Some(ServerType::RsPrimary)));
}

#[test]
fn mongos_write_concern_errors_not_labelled() {
    let error = Error::new(
        ErrorKind::Write(WriteFailure::WriteConcernError(
            crate::bson::from_document(doc! { "code": 91, "errmsg": "shutting down" }).unwrap(),
        )),
        None::<Vec<String>>,
    );
    assert_eq!(error.sdam_code(), Some(91));
    assert!(!error.should_add_retryable_write_label(8, Some(ServerType::Mongos)));
    assert!(error.should_add_retryable_write_label(8, Some(ServerType::RsPrimary)));
}

#[test]
fn write_concern_error_labels_lifted() {
    let error = Error::new(
        ErrorKind::Write(WriteFailure::WriteConcernError(
            crate::bson::from_document(doc! {
                "code": 64,
                "errmsg": "timed out",
                "errorLabels": [RETRYABLE_WRITE_ERROR],
            })
            .unwrap(),
        )),
        None::<Vec<String>>,
    );
    assert!(error.contains_label(RETRYABLE_WRITE_ERROR));
}

#[test]
fn labels_checked_on_source() {
    let mut source = Error::network_timeout();
    source.add_label(RETRYABLE_WRITE_ERROR);
    let error = Error::incompatible_server("wrapped").with_source(source);

    assert!(!error.labels().contains(RETRYABLE_WRITE_ERROR));
    assert!(error.contains_label(RETRYABLE_WRITE_ERROR));
    assert!(error.source_error().unwrap().is_network_error());
}

#[test]
fn sdam_code_falls_back_to_source() {
    let error = Error::internal("outer").with_source(command_error(11600));
    assert_eq!(error.sdam_code(), Some(11600));
}

#[test]
fn server_error_classification() {
    assert!(command_error(1).is_server_error());
    assert!(!Error::network_timeout().is_server_error());
    assert!(command_error(26).is_ns_not_found());
    assert!(!command_error(27).is_ns_not_found());
}

#[test]
fn insert_many_error_converted_to_write_error() {
    let error = Error::new(
        ErrorKind::InsertMany(
            crate::bson::from_document(doc! {
                "writeErrors": [{ "index": 0, "code": 11000, "errmsg": "duplicate key" }],
            })
            .unwrap(),
        ),
        Some(vec!["SomeLabel".to_string()]),
    );

    let converted = convert_insert_many_error(error);
    assert!(matches!(
        *converted.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == 11000
    ));
    assert!(converted.contains_label("SomeLabel"));
}
