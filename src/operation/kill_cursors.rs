use crate::{
    bson::{doc, Document},
    error::{Error, Result},
    operation::{BuildContext, Command, OperationKind, OperationOutput, OperationWithDefaults},
    options::ServerAddress,
    sdam::ServerDescription,
    trace::OPERATION_TRACING_EVENT_TARGET,
    Namespace,
};

/// Closes cursors on the server that created them. Failures are logged and otherwise ignored:
/// the server reaps idle cursors on its own.
#[derive(Debug, Clone)]
pub(crate) struct KillCursors {
    ns: Namespace,
    cursor_ids: Vec<i64>,
    address: ServerAddress,
}

impl KillCursors {
    pub(crate) fn new(ns: Namespace, cursor_ids: Vec<i64>, address: ServerAddress) -> Self {
        Self {
            ns,
            cursor_ids,
            address,
        }
    }
}

impl OperationWithDefaults for KillCursors {
    const NAME: &'static str = "killCursors";
    const KIND: OperationKind = OperationKind::KillCursors;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
            "cursors": self.cursor_ids.clone(),
        };

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        _response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        Ok(OperationOutput::Unit)
    }

    fn handle_error(&self, error: Error) -> Result<OperationOutput> {
        tracing::debug!(
            target: OPERATION_TRACING_EVENT_TARGET,
            error = %error,
            "Failed to kill cursors"
        );
        Ok(OperationOutput::Unit)
    }

    fn bound_server(&self) -> Option<&ServerAddress> {
        Some(&self.address)
    }
}
