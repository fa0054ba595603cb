mod pool;

use std::time::{Duration, Instant};

use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::{
    bson::{doc, spec::BinarySubtype, Binary, Bson, Document},
    error::{Error, ErrorKind, Result},
    operation::Operation,
    options::{ServerAddress, SessionOptions, TransactionOptions, WriteConcern},
    retry::Retryability,
    trace::OPERATION_TRACING_EVENT_TARGET,
    Client,
};
pub(crate) use pool::ServerSessionPool;

/// A MongoDB client session. This struct represents a logical session used for ordering sequential
/// operations. To create a `ClientSession`, call [`Client::start_session`].
///
/// A session is passed to [`Client::execute`] alongside the operation it should be used for. The
/// mutable borrow taken by `execute` keeps a session from being used by two operations at once.
///
/// ## Transactions
/// To begin a transaction, call [`ClientSession::start_transaction`], then pass the session to
/// every operation that should be part of the transaction. The transaction is finished with
/// [`ClientSession::commit_transaction`] or [`ClientSession::abort_transaction`].
///
/// ```no_run
/// # use mongodb_executor::{bson::doc, error::Result, operation::Operation, Client, Namespace};
/// # async fn run(client: Client) -> Result<()> {
/// let mut session = client.start_session(None).await?;
/// session.start_transaction(None)?;
/// let insert = Operation::insert_one(Namespace::new("app", "orders"), &doc! { "sku": 1 }, None)?;
/// client.execute(insert, Some(&mut session)).await?;
/// session.commit_transaction().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClientSession {
    server_session: ServerSession,
    client: Client,
    has_ended: bool,
    owner: Option<Uuid>,
    options: Option<SessionOptions>,
    logical_session_timeout: Option<Duration>,
    pub(crate) transaction: Transaction,
}

/// Options for [`ClientSession::unpin`].
#[derive(Clone, Copy, Debug, Default, TypedBuilder, PartialEq)]
#[builder(field_defaults(default))]
#[non_exhaustive]
pub struct UnpinOptions {
    /// Clear the pinned server even while a transaction is in progress.
    pub force: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Transaction {
    pub(crate) state: TransactionState,
    pub(crate) options: Option<TransactionOptions>,
    pub(crate) pinned: Option<ServerAddress>,
}

impl Transaction {
    pub(crate) fn start(&mut self, options: Option<TransactionOptions>) {
        self.state = TransactionState::Starting;
        self.options = options;
    }

    pub(crate) fn commit(&mut self, data_committed: bool) {
        self.state = TransactionState::Committed { data_committed };
    }

    pub(crate) fn abort(&mut self) {
        self.state = TransactionState::Aborted;
        self.options = None;
        self.pinned = None;
    }

    pub(crate) fn reset(&mut self) {
        self.state = TransactionState::None;
        self.options = None;
        self.pinned = None;
    }

    fn write_concern(&self) -> Option<WriteConcern> {
        self.options
            .as_ref()
            .and_then(|options| options.write_concern.clone())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum TransactionState {
    #[default]
    None,
    Starting,
    InProgress,
    Committed {
        /// Whether any command ran inside the transaction before it was committed. A repeated
        /// commit only contacts the server when this is true.
        data_committed: bool,
    },
    Aborted,
}

impl ClientSession {
    /// Creates a new `ClientSession` by checking out a `ServerSession` from the client's pool.
    /// Implicit sessions carry the token of the guard that owns them.
    pub(crate) fn new(
        client: Client,
        options: Option<SessionOptions>,
        owner: Option<Uuid>,
        logical_session_timeout: Option<Duration>,
    ) -> Self {
        let server_session = client.session_pool().check_out(logical_session_timeout);
        Self {
            server_session,
            client,
            has_ended: false,
            owner,
            options,
            logical_session_timeout,
            transaction: Default::default(),
        }
    }

    /// The client used to create this session.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// The id of this session, as sent in the `lsid` field of commands.
    pub fn id(&self) -> &Document {
        &self.server_session.id
    }

    /// The options used to create this session.
    pub fn options(&self) -> Option<&SessionOptions> {
        self.options.as_ref()
    }

    /// Whether [`ClientSession::end_session`] has been called on this session.
    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    /// Whether this session is currently in a transaction.
    pub fn in_transaction(&self) -> bool {
        matches!(
            self.transaction.state,
            TransactionState::Starting | TransactionState::InProgress
        )
    }

    /// Whether this session is pinned to a single mongos.
    pub fn is_pinned(&self) -> bool {
        self.transaction.pinned.is_some()
    }

    /// Whether reads on this session share a snapshot.
    pub fn is_snapshot(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|options| options.snapshot)
            .unwrap_or(false)
    }

    pub(crate) fn client_id(&self) -> Uuid {
        self.client.id()
    }

    pub(crate) fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    /// Mark the underlying server session as dirty so it is discarded instead of reused.
    pub(crate) fn mark_dirty(&mut self) {
        self.server_session.dirty = true;
    }

    pub(crate) fn update_last_use(&mut self) {
        self.server_session.last_use = Instant::now();
    }

    /// The current transaction number.
    pub fn txn_number(&self) -> i64 {
        self.server_session.txn_number
    }

    /// Increments the transaction number.
    pub fn increment_txn_number(&mut self) {
        self.server_session.txn_number += 1;
    }

    pub(crate) fn get_and_increment_txn_number(&mut self) -> i64 {
        self.increment_txn_number();
        self.txn_number()
    }

    /// The transaction number to send with an operation, if any. Commands inside a transaction
    /// share the number the transaction started with; a retryable write takes a fresh one.
    pub(crate) fn get_txn_number_for_operation(
        &mut self,
        retryability: Retryability,
    ) -> Option<i64> {
        if self.transaction.state != TransactionState::None {
            Some(self.txn_number())
        } else if retryability == Retryability::Write {
            Some(self.get_and_increment_txn_number())
        } else {
            None
        }
    }

    pub(crate) fn pin_mongos(&mut self, address: ServerAddress) {
        self.transaction.pinned = Some(address);
    }

    pub(crate) fn pinned_address(&self) -> Option<&ServerAddress> {
        self.transaction.pinned.as_ref()
    }

    /// Clears the server this session is pinned to. Without [`UnpinOptions::force`] a session
    /// inside a transaction keeps its pin.
    pub fn unpin(&mut self, options: impl Into<Option<UnpinOptions>>) {
        let force = options.into().is_some_and(|options| options.force);
        if self.transaction.pinned.is_none() || (self.in_transaction() && !force) {
            return;
        }
        tracing::trace!(
            target: OPERATION_TRACING_EVENT_TARGET,
            pinned = ?self.transaction.pinned,
            "Unpinning session"
        );
        self.transaction.pinned = None;
    }

    /// Starts a new transaction on this session. The transaction begins with the next operation
    /// executed with this session.
    pub fn start_transaction(
        &mut self,
        options: impl Into<Option<TransactionOptions>>,
    ) -> Result<()> {
        if self.has_ended() {
            return Err(ErrorKind::ExpiredSession.into());
        }
        if self.is_snapshot() {
            return Err(Error::transaction(
                "Transactions are not supported in snapshot sessions",
            ));
        }
        match self.transaction.state {
            TransactionState::Starting | TransactionState::InProgress => {
                return Err(Error::transaction("transaction already in progress"));
            }
            TransactionState::Committed { .. } => {
                self.unpin(UnpinOptions { force: true });
            }
            _ => {}
        }

        let options = options.into();
        if options
            .as_ref()
            .and_then(|options| options.write_concern.as_ref())
            .is_some_and(|write_concern| !write_concern.is_acknowledged())
        {
            return Err(Error::transaction(
                "transactions do not support unacknowledged write concerns",
            ));
        }

        self.increment_txn_number();
        self.transaction.start(options);
        Ok(())
    }

    /// Commits the transaction that is currently active on this session.
    ///
    /// Committing a transaction in which no operation ran does not contact the server.
    pub async fn commit_transaction(&mut self) -> Result<()> {
        match self.transaction.state {
            TransactionState::None => Err(Error::transaction("no transaction started")),
            TransactionState::Aborted => Err(Error::transaction(
                "Cannot call commitTransaction after calling abortTransaction",
            )),
            TransactionState::Starting => {
                self.transaction.commit(false);
                Ok(())
            }
            TransactionState::InProgress => {
                self.transaction.commit(true);
                self.run_end_transaction("commitTransaction").await
            }
            TransactionState::Committed {
                data_committed: true,
            } => self.run_end_transaction("commitTransaction").await,
            TransactionState::Committed {
                data_committed: false,
            } => Ok(()),
        }
    }

    /// Aborts the transaction that is currently active on this session. Failures reported by the
    /// server while aborting are ignored.
    pub async fn abort_transaction(&mut self) -> Result<()> {
        match self.transaction.state {
            TransactionState::None => Err(Error::transaction("no transaction started")),
            TransactionState::Committed { .. } => Err(Error::transaction(
                "Cannot call abortTransaction after calling commitTransaction",
            )),
            TransactionState::Aborted => Err(Error::transaction(
                "cannot call abortTransaction twice",
            )),
            TransactionState::Starting => {
                self.transaction.abort();
                Ok(())
            }
            TransactionState::InProgress => {
                self.transaction.state = TransactionState::Aborted;
                if let Err(error) = self.run_end_transaction("abortTransaction").await {
                    tracing::debug!(
                        target: OPERATION_TRACING_EVENT_TARGET,
                        %error,
                        "abortTransaction failed"
                    );
                }
                self.transaction.abort();
                Ok(())
            }
        }
    }

    async fn run_end_transaction(&mut self, command_name: &str) -> Result<()> {
        let operation = Operation::end_transaction(
            doc! { command_name: 1 },
            self.transaction.write_concern(),
        )?;
        let client = self.client.clone();
        client.execute(operation, Some(self)).await.map(|_| ())
    }

    /// Ends this session, returning its server session to the client's pool. Operations executed
    /// with an ended session fail.
    pub fn end_session(&mut self) {
        if self.has_ended {
            return;
        }
        self.has_ended = true;
        self.client
            .session_pool()
            .check_in(self.server_session.clone(), self.logical_session_timeout);
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.server_session.dirty
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        // The server aborts transactions whose session it never hears from again.
        if self.transaction.state == TransactionState::InProgress {
            self.mark_dirty();
        }
        self.end_session();
    }
}

/// A session created by the executor for a single operation. Ends the session when dropped, as
/// long as the session still belongs to this guard.
#[derive(Debug)]
pub(crate) struct ImplicitSession {
    token: Uuid,
    session: ClientSession,
}

impl ImplicitSession {
    pub(crate) fn new(client: &Client, logical_session_timeout: Option<Duration>) -> Self {
        let token = Uuid::new_v4();
        Self {
            token,
            session: ClientSession::new(
                client.clone(),
                None,
                Some(token),
                logical_session_timeout,
            ),
        }
    }

    pub(crate) fn session_mut(&mut self) -> &mut ClientSession {
        &mut self.session
    }
}

impl Drop for ImplicitSession {
    fn drop(&mut self) {
        if self.session.owner() == Some(self.token) {
            self.session.end_session();
        } else {
            tracing::debug!(
                target: OPERATION_TRACING_EVENT_TARGET,
                "Implicit session was not ended by its guard because it has another owner"
            );
        }
    }
}

/// Client side abstraction of a server session. These are pooled and may be associated with
/// multiple `ClientSession`s over the course of their lifetime.
#[derive(Clone, Debug)]
pub(crate) struct ServerSession {
    /// The id of the server session to which this corresponds.
    id: Document,

    /// The last time an operation was executed with this session.
    last_use: Instant,

    /// Whether a network error was encountered while using this session.
    dirty: bool,

    /// A monotonically increasing transaction number for this session.
    txn_number: i64,
}

impl ServerSession {
    /// Creates a new session, generating the id client side.
    fn new() -> Self {
        let binary = Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: Uuid::new_v4().as_bytes().to_vec(),
        });

        Self {
            id: doc! { "id": binary },
            last_use: Instant::now(),
            dirty: false,
            txn_number: 0,
        }
    }

    /// Whether this server session will expire within the next minute.
    fn is_about_to_expire(&self, logical_session_timeout: Option<Duration>) -> bool {
        let timeout = match logical_session_timeout {
            Some(t) => t,
            None => return false,
        };
        let expiration_date = self.last_use + timeout;
        expiration_date < Instant::now() + Duration::from_secs(60)
    }
}
