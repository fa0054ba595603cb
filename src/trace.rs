use std::time::Duration;

use crate::{
    bson::{Bson, Document},
    error::Error,
    operation::Command,
    options::{ServerAddress, ServerSelector},
};

pub(crate) const COMMAND_TRACING_EVENT_TARGET: &str = "mongodb_executor::command";
pub(crate) const SERVER_SELECTION_TRACING_EVENT_TARGET: &str = "mongodb_executor::server_selection";
pub(crate) const OPERATION_TRACING_EVENT_TARGET: &str = "mongodb_executor::operation";

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for Document {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        Bson::Document(self.clone())
            .into_relaxed_extjson()
            .to_string()
    }
}

impl TracingRepresentation for Error {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.to_string()
    }
}

impl TracingRepresentation for ServerSelector {
    type Representation = String;

    fn tracing_representation(&self) -> Self::Representation {
        self.to_string()
    }
}

pub(crate) fn command_started(command: &Command, address: &ServerAddress, operation_id: u64) {
    // skip rendering the command when nobody listens
    if !tracing::enabled!(target: COMMAND_TRACING_EVENT_TARGET, tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(
        target: COMMAND_TRACING_EVENT_TARGET,
        command = command.body.tracing_representation(),
        database_name = command.target_db.as_str(),
        command_name = command.name.as_str(),
        operation_id,
        server_host = address.host(),
        server_port = address.port(),
        "Command started"
    );
}

pub(crate) fn command_succeeded(
    command: &Command,
    address: &ServerAddress,
    operation_id: u64,
    reply: &Document,
    duration: Duration,
) {
    if !tracing::enabled!(target: COMMAND_TRACING_EVENT_TARGET, tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(
        target: COMMAND_TRACING_EVENT_TARGET,
        reply = reply.tracing_representation(),
        command_name = command.name.as_str(),
        operation_id,
        duration_ms = duration.as_millis(),
        server_host = address.host(),
        server_port = address.port(),
        "Command succeeded"
    );
}

pub(crate) fn command_failed(
    command: &Command,
    address: &ServerAddress,
    operation_id: u64,
    error: &Error,
    duration: Duration,
) {
    tracing::debug!(
        target: COMMAND_TRACING_EVENT_TARGET,
        failure = error.tracing_representation(),
        command_name = command.name.as_str(),
        operation_id,
        duration_ms = duration.as_millis(),
        server_host = address.host(),
        server_port = address.port(),
        "Command failed"
    );
}

pub(crate) fn server_selection_succeeded(
    selector: &ServerSelector,
    operation_name: &str,
    operation_id: u64,
    address: &ServerAddress,
) {
    tracing::debug!(
        target: SERVER_SELECTION_TRACING_EVENT_TARGET,
        selector = selector.tracing_representation(),
        operation = operation_name,
        operation_id,
        server_host = address.host(),
        server_port = address.port(),
        "Server selection succeeded"
    );
}

pub(crate) fn server_selection_failed(
    selector: &ServerSelector,
    operation_name: &str,
    operation_id: u64,
    error: &Error,
) {
    tracing::debug!(
        target: SERVER_SELECTION_TRACING_EVENT_TARGET,
        selector = selector.tracing_representation(),
        operation = operation_name,
        operation_id,
        failure = error.tracing_representation(),
        "Server selection failed"
    );
}
