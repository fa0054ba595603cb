use std::{sync::Arc, time::Instant};

use super::{
    session::{ClientSession, ImplicitSession, TransactionState, UnpinOptions},
    Client,
};
use crate::{
    bson::{Bson, Document},
    bson_util,
    error::{Error, ErrorKind, Result, RETRYABLE_WRITE_ERROR, TRANSIENT_TRANSACTION_ERROR},
    operation::{
        Aspects,
        BuildContext,
        Command,
        CommandErrorBody,
        Operation,
        OperationOutput,
    },
    options::{ReadPreference, ServerAddress, ServerSelector},
    retry::{is_legacy_storage_engine_error, legacy_storage_engine_error, Retryability},
    sdam::{CommandOptions, SelectionContext, Server, ServerDescription, Topology},
    trace::{self, OPERATION_TRACING_EVENT_TARGET},
};

/// State carried from a failed first attempt into the retry.
#[derive(Debug)]
struct ExecutionRetry {
    prior_txn_number: Option<i64>,
    first_error: Error,
    first_server: ServerAddress,
    retryability: Retryability,
}

trait RetryHelper {
    fn first_error(&mut self) -> Result<()>;
}

impl RetryHelper for Option<ExecutionRetry> {
    /// Surfaces the error from the first attempt if a retry is in progress.
    fn first_error(&mut self) -> Result<()> {
        match self.take() {
            Some(retry) => Err(retry.first_error),
            None => Ok(()),
        }
    }
}

impl Client {
    /// Executes an operation, optionally as part of the given session.
    ///
    /// When no session is given and the deployment supports sessions, an implicit session is
    /// created for the duration of the call. Reads and writes that fail with a retryable error are
    /// attempted a second time on a freshly selected server, following the client's
    /// [`RetryPolicy`](crate::retry::RetryPolicy).
    pub async fn execute(
        &self,
        mut operation: Operation,
        session: Option<&mut ClientSession>,
    ) -> Result<OperationOutput> {
        let topology = self.topology().await?;
        let capabilities = topology.capabilities();

        if let Some(ref session) = session {
            if session.has_ended() {
                return Err(ErrorKind::ExpiredSession.into());
            }
            if session.client_id() != self.id() {
                return Err(ErrorKind::SessionOwnershipMismatch.into());
            }
            if session.is_snapshot() && !capabilities.supports_snapshot_reads {
                return Err(Error::incompatible_server(
                    "snapshot reads are not supported by this deployment",
                ));
            }
        }

        let in_transaction = session.as_ref().is_some_and(|s| s.in_transaction());
        if !in_transaction {
            operation.inherit_concerns(self.options());
        }
        operation.validate()?;

        if session.is_some() && !operation.is_acknowledged() {
            return Err(Error::invalid_argument(
                "Cannot use ClientSessions with unacknowledged write concern",
            ));
        }

        let read_preference = operation
            .read_preference()
            .cloned()
            .unwrap_or(ReadPreference::Primary);
        if in_transaction && !read_preference.is_primary() {
            return Err(Error::transaction(
                "read preference in a transaction must be primary",
            ));
        }

        let mut implicit_session = match session {
            None if capabilities.supports_sessions && operation.is_acknowledged() => Some(
                ImplicitSession::new(self, capabilities.logical_session_timeout),
            ),
            _ => None,
        };
        let mut session = match (session, implicit_session.as_mut()) {
            (Some(session), _) => Some(session),
            (None, Some(implicit)) => Some(implicit.session_mut()),
            (None, None) => None,
        };

        if let Some(ref mut session) = session {
            match session.transaction.state {
                TransactionState::Committed { .. } | TransactionState::Aborted
                    if !operation.ends_transaction() =>
                {
                    session.transaction.reset();
                }
                _ => {}
            }
        }

        let selector = self.selector_for(
            &operation,
            read_preference.clone(),
            session.as_deref(),
            topology.as_ref(),
        );

        let result = self
            .execute_with_retry(&operation, selector, &read_preference, &topology, &mut session)
            .await;
        drop(implicit_session);
        result
    }

    fn selector_for(
        &self,
        operation: &Operation,
        read_preference: ReadPreference,
        session: Option<&ClientSession>,
        topology: &dyn Topology,
    ) -> ServerSelector {
        if let Some(address) = session.and_then(|s| s.pinned_address()) {
            return ServerSelector::SameServer(address.clone());
        }
        if operation.has_aspect(Aspects::MUST_SELECT_SAME_SERVER) {
            if let Some(address) = operation.bound_server() {
                return ServerSelector::SameServer(address.clone());
            }
        }
        if operation.secondary_writable() {
            return ServerSelector::SecondaryWritable {
                read_preference,
                common_wire_version: topology.common_wire_version(),
            };
        }
        ServerSelector::ReadPreference(read_preference)
    }

    async fn execute_with_retry(
        &self,
        operation: &Operation,
        mut selector: ServerSelector,
        read_preference: &ReadPreference,
        topology: &Arc<dyn Topology>,
        session: &mut Option<&mut ClientSession>,
    ) -> Result<OperationOutput> {
        let operation_id = self.next_operation_id();
        let policy = self.retry_policy();
        let mut retry: Option<ExecutionRetry> = None;

        loop {
            let context = SelectionContext::new(operation.name())
                .deprioritize(retry.as_ref().map(|r| &r.first_server));
            let server = match topology.select_server(&selector, context).await {
                Ok(server) => server,
                Err(mut error) => {
                    trace::server_selection_failed(
                        &selector,
                        operation.name(),
                        operation_id,
                        &error,
                    );
                    retry.first_error()?;

                    self.add_labels_and_update_pin(None, session.as_deref_mut(), None, &mut error);
                    return Err(error);
                }
            };
            let description = server.description();
            trace::server_selection_succeeded(
                &selector,
                operation.name(),
                operation_id,
                &description.address,
            );

            if operation.has_aspect(Aspects::MUST_SELECT_SAME_SERVER) {
                if let Some(bound) = operation.bound_server() {
                    if *bound != description.address {
                        retry.first_error()?;
                        return Err(Error::internal(format!(
                            "{} must run on {bound}, but {} was selected",
                            operation.name(),
                            description.address
                        )));
                    }
                }
            }

            let retryability = self.get_retryability(operation, session.as_deref(), &description);
            if let Some(ref prior) = retry {
                if prior.retryability == Retryability::Write && retryability != Retryability::Write
                {
                    return Err(Error::unexpected_server_response(format!(
                        "the server selected to retry {} does not support retryable writes; the \
                         first attempt failed with: {}",
                        operation.name(),
                        prior.first_error
                    )));
                }
            }

            let txn_number = match retry.as_ref().and_then(|r| r.prior_txn_number) {
                Some(txn_number) => Some(txn_number),
                None => session
                    .as_deref_mut()
                    .and_then(|s| s.get_txn_number_for_operation(retryability)),
            };

            let result = match self.build_command(
                operation,
                session.as_deref_mut(),
                txn_number,
                &description,
            ) {
                Ok(command) => {
                    self.dispatch(
                        operation,
                        &command,
                        server.as_ref(),
                        &description,
                        read_preference,
                        session.as_deref_mut(),
                        retryability,
                        operation_id,
                    )
                    .await
                }
                Err(error) => Err(error),
            };

            let mut error = match result {
                Ok(output) => return Ok(output),
                Err(error) => error,
            };
            error.wire_version = description.max_wire_version;

            if let Some(prior) = retry {
                if policy.is_no_writes_performed(&error) {
                    return Err(prior.first_error);
                }
                return Err(error);
            }

            if retryability == Retryability::Write && is_legacy_storage_engine_error(&error) {
                return Err(legacy_storage_engine_error(error));
            }

            if !retryability.can_retry_error(policy, &error) {
                return Err(error);
            }

            if error.is_network_error() && operation.has_aspect(Aspects::CURSOR_CREATING) {
                if let Some(session) = session.as_deref_mut() {
                    if !session.in_transaction() && session.is_pinned() {
                        session.unpin(UnpinOptions { force: true });
                        selector = self.selector_for(
                            operation,
                            read_preference.clone(),
                            Some(&*session),
                            topology.as_ref(),
                        );
                    }
                }
            }

            tracing::debug!(
                target: OPERATION_TRACING_EVENT_TARGET,
                operation = operation.name(),
                operation_id,
                error = %error,
                server_host = description.address.host(),
                server_port = description.address.port(),
                "Retrying operation"
            );

            retry = Some(ExecutionRetry {
                prior_txn_number: txn_number,
                first_error: error,
                first_server: description.address.clone(),
                retryability,
            });
        }
    }

    /// Renders the operation and decorates the command with the session's fields.
    fn build_command(
        &self,
        operation: &Operation,
        session: Option<&mut ClientSession>,
        txn_number: Option<i64>,
        description: &ServerDescription,
    ) -> Result<Command> {
        let in_transaction = session.as_ref().is_some_and(|s| s.in_transaction());
        let mut command =
            operation.build_command(&BuildContext::new(description, in_transaction))?;

        if let Some(session) = session {
            command.set_session(session);
            if let Some(txn_number) = txn_number {
                command.set_txn_number(txn_number);
            }

            match session.transaction.state {
                TransactionState::Starting => {
                    command.set_start_transaction();
                    command.set_autocommit();
                    if let Some(read_concern) = session
                        .transaction
                        .options
                        .as_ref()
                        .and_then(|options| options.read_concern.as_ref())
                    {
                        command.set_read_concern(read_concern)?;
                    }
                    if description.is_sharded() {
                        session.pin_mongos(description.address.clone());
                    }
                    session.transaction.state = TransactionState::InProgress;
                }
                TransactionState::InProgress
                | TransactionState::Committed { .. }
                | TransactionState::Aborted => {
                    command.set_autocommit();
                }
                TransactionState::None => {}
            }

            session.update_last_use();
        }

        Ok(command)
    }

    /// Sends the command and turns the reply into the operation's output.
    #[allow(clippy::too_many_arguments)]
    async fn dispatch(
        &self,
        operation: &Operation,
        command: &Command,
        server: &dyn Server,
        description: &ServerDescription,
        read_preference: &ReadPreference,
        mut session: Option<&mut ClientSession>,
        retryability: Retryability,
        operation_id: u64,
    ) -> Result<OperationOutput> {
        trace::command_started(command, &description.address, operation_id);
        let start = Instant::now();

        let options = CommandOptions {
            read_preference: Some(read_preference.clone()),
        };
        let reply = server
            .command(command, options)
            .await
            .and_then(parse_reply);

        let reply = match reply {
            Ok(reply) => {
                trace::command_succeeded(
                    command,
                    &description.address,
                    operation_id,
                    &reply,
                    start.elapsed(),
                );
                reply
            }
            Err(mut error) => {
                trace::command_failed(
                    command,
                    &description.address,
                    operation_id,
                    &error,
                    start.elapsed(),
                );
                if error.is_network_error() {
                    if let Some(session) = session.as_deref_mut() {
                        session.mark_dirty();
                    }
                }
                self.add_labels_and_update_pin(
                    Some(description),
                    session,
                    Some(retryability),
                    &mut error,
                );
                return operation.handle_error(error);
            }
        };

        match operation.handle_response(reply, description) {
            Ok(output) => Ok(output),
            Err(mut error) => {
                self.add_labels_and_update_pin(
                    Some(description),
                    session,
                    Some(retryability),
                    &mut error,
                );
                operation.handle_error(error)
            }
        }
    }

    /// Decides how the operation may be retried on the selected server.
    fn get_retryability(
        &self,
        operation: &Operation,
        session: Option<&ClientSession>,
        description: &ServerDescription,
    ) -> Retryability {
        let Some(session) = session else {
            return Retryability::None;
        };
        if operation.ends_transaction() {
            return Retryability::Write;
        }
        if session.in_transaction() {
            return Retryability::None;
        }
        match operation.retryability().with_options(self.options()) {
            Retryability::Write if description.supports_retryable_writes() => {
                Retryability::Write
            }
            Retryability::Read => Retryability::Read,
            _ => Retryability::None,
        }
    }

    /// Adds the labels the error should carry given the session's transaction state, and unpins
    /// the session when the transaction cannot continue on the pinned server.
    fn add_labels_and_update_pin(
        &self,
        description: Option<&ServerDescription>,
        session: Option<&mut ClientSession>,
        retryability: Option<Retryability>,
        error: &mut Error,
    ) {
        let transaction_state = session
            .as_ref()
            .map_or(&TransactionState::None, |session| &session.transaction.state);
        let max_wire_version = description.and_then(|d| d.max_wire_version);
        let server_type = description.map(|d| d.server_type);

        let label_retryable_write = match transaction_state {
            TransactionState::Starting | TransactionState::InProgress => {
                if error.is_network_error() || error.is_server_selection_error() {
                    error.add_label(TRANSIENT_TRANSACTION_ERROR);
                }
                false
            }
            TransactionState::Committed { .. } | TransactionState::Aborted => true,
            TransactionState::None => retryability == Some(Retryability::Write),
        };

        if label_retryable_write {
            if let Some(max_wire_version) = max_wire_version {
                if error.should_add_retryable_write_label(max_wire_version, server_type) {
                    error.add_label(RETRYABLE_WRITE_ERROR);
                }
            }
        }

        if let Some(session) = session {
            if error.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                session.unpin(UnpinOptions { force: true });
            }
        }
    }
}

/// Interprets the `ok` field of a reply, turning failed replies into command errors.
fn parse_reply(reply: Document) -> Result<Document> {
    let succeeded = match reply.get("ok") {
        Some(Bson::Boolean(ok)) => *ok,
        Some(ok) => bson_util::get_int(ok) == Some(1),
        None => return Err(Error::invalid_response("reply is missing the ok field")),
    };
    if succeeded {
        return Ok(reply);
    }

    let error: CommandErrorBody = crate::bson::from_document(reply)
        .map_err(|e| Error::invalid_response(format!("unable to parse command error: {e}")))?;
    Err(error.into())
}
