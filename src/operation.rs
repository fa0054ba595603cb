//! Contains the logical operations the executor runs and the machinery shared by all of them.

mod aggregate;
mod aspect;
mod command;
mod count;
mod delete;
mod distinct;
mod drop_collection;
mod find;
mod find_and_modify;
mod get_more;
mod insert;
mod kill_cursors;
mod list_collections;
mod list_databases;
pub(crate) mod options;
mod run_command;
mod update;

#[cfg(test)]
mod test;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::{
    bson::{Bson, Document},
    collation::Collation,
    concern::{ReadConcern, WriteConcern},
    cursor::{CursorInformation, CursorSpecification},
    error::{
        CommandError,
        Error,
        ErrorKind,
        IndexedWriteError,
        InsertManyError,
        Result,
        WriteConcernError,
        WriteFailure,
    },
    options::{
        AggregateOptions,
        ClientOptions,
        CountOptions,
        DeleteOptions,
        DistinctOptions,
        DropCollectionOptions,
        Explain,
        FindOneAndDeleteOptions,
        FindOneAndReplaceOptions,
        FindOneAndUpdateOptions,
        FindOptions,
        InsertOptions,
        ListCollectionsOptions,
        ListDatabasesOptions,
        ReadPreference,
        ReplaceOptions,
        ServerAddress,
        UpdateModifications,
        UpdateOptions,
    },
    results::{DeleteResult, GetMoreResult, InsertManyResult, InsertOneResult, UpdateResult},
    retry::Retryability,
    sdam::ServerDescription,
    serde_util,
    Namespace,
};

pub use aspect::{Aspects, OperationKind};
pub use command::Command;

use aggregate::Aggregate;
use count::Count;
use delete::Delete;
use distinct::Distinct;
use drop_collection::DropCollection;
use find::Find;
use find_and_modify::FindAndModify;
use get_more::GetMore;
use insert::Insert;
use kill_cursors::KillCursors;
use list_collections::ListCollections;
use list_databases::ListDatabases;
use run_command::RunCommand;
use update::Update;

pub(crate) const SERVER_4_2_0_WIRE_VERSION: i32 = 8;
pub(crate) const SERVER_4_4_0_WIRE_VERSION: i32 = 9;

/// What the command builder needs to know about the dispatch target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct BuildContext {
    /// The max wire version of the selected server; zero when unknown.
    pub(crate) max_wire_version: i32,

    /// Whether the command runs inside a multi-statement transaction.
    pub(crate) in_transaction: bool,
}

impl BuildContext {
    pub(crate) fn new(description: &ServerDescription, in_transaction: bool) -> Self {
        Self {
            max_wire_version: description.max_wire_version.unwrap_or(0),
            in_transaction,
        }
    }
}

/// The result of successfully executing an [`Operation`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum OperationOutput {
    /// A server-side cursor created by `find`, `aggregate` or `listCollections`.
    Cursor(CursorSpecification),

    /// The next batch of an existing cursor.
    GetMore(GetMoreResult),

    /// The outcome of inserting a single document.
    InsertOne(InsertOneResult),

    /// The outcome of inserting several documents.
    InsertMany(InsertManyResult),

    /// The outcome of an update or replacement.
    Update(UpdateResult),

    /// The outcome of a delete.
    Delete(DeleteResult),

    /// The number of documents matched by a `count`.
    Count(u64),

    /// The distinct values of a field.
    Distinct(Vec<Bson>),

    /// The document returned by a `findAndModify`, if one matched.
    FindAndModify(Option<Document>),

    /// The database descriptions returned by `listDatabases`.
    ListDatabases(Vec<Document>),

    /// The raw reply to an arbitrary command or an `explain`.
    Command(Document),

    /// The operation has no meaningful output.
    Unit,
}

/// Behaviour shared by every operation kind, with the common cases supplied as defaults.
pub(crate) trait OperationWithDefaults: Debug {
    /// The name of the server side command associated with this operation.
    const NAME: &'static str;

    /// The kind of this operation, which determines its aspects.
    const KIND: OperationKind;

    /// Returns the command that should be sent to the server as part of this operation, without
    /// the collation, concerns or session fields the executor attaches.
    fn build(&self, context: &BuildContext) -> Result<Command>;

    /// Interprets the server response to the command.
    fn handle_response(
        &self,
        response: Document,
        description: &ServerDescription,
    ) -> Result<OperationOutput>;

    /// Interpret an error encountered while sending the built command to the server, potentially
    /// recovering.
    fn handle_error(&self, error: Error) -> Result<OperationOutput> {
        Err(error)
    }

    /// Checks the arguments that can only be judged once the concerns are final.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// The read preference requested by the operation.
    fn read_preference(&self) -> Option<&ReadPreference> {
        None
    }

    /// The read concern to use for this operation, if any.
    fn read_concern(&self) -> Option<&ReadConcern> {
        None
    }

    /// Sets the read concern inherited from the client.
    fn set_read_concern(&mut self, _read_concern: ReadConcern) {}

    /// The write concern to use for this operation, if any.
    fn write_concern(&self) -> Option<&WriteConcern> {
        None
    }

    /// Sets the write concern inherited from the client.
    fn set_write_concern(&mut self, _write_concern: WriteConcern) {}

    /// Whether or not this operation will request acknowledgment from the server.
    fn is_acknowledged(&self) -> bool {
        self.write_concern()
            .map(WriteConcern::is_acknowledged)
            .unwrap_or(true)
    }

    /// The collation attached at the root of the command.
    fn collation(&self) -> Option<&Collation> {
        None
    }

    /// Returns whether or not this command supports the `readConcern` field.
    fn supports_read_concern(&self, _context: &BuildContext) -> bool {
        Self::KIND.accepts_read_concern()
    }

    /// Whether the command carries a `writeConcern`.
    fn attaches_write_concern(&self) -> bool {
        Self::KIND.has_aspect(Aspects::WRITE_OPERATION)
    }

    /// Whether this particular read may be retried.
    fn can_retry_read(&self) -> bool {
        true
    }

    /// Whether this particular write may be retried.
    fn can_retry_write(&self) -> bool {
        true
    }

    /// Whether the operation writes despite being routed like a read, and so may only run on a
    /// secondary when the whole deployment supports it.
    fn secondary_writable(&self) -> bool {
        false
    }

    /// The server the operation must run on, if it continues work started there.
    fn bound_server(&self) -> Option<&ServerAddress> {
        None
    }

    /// The level of retryability the operation supports.
    fn retryability(&self) -> Retryability {
        let kind = Self::KIND;
        if !kind.has_aspect(Aspects::RETRYABLE) {
            Retryability::None
        } else if kind.has_aspect(Aspects::WRITE_OPERATION) && self.can_retry_write() {
            Retryability::Write
        } else if kind.has_aspect(Aspects::READ_OPERATION) && self.can_retry_read() {
            Retryability::Read
        } else {
            Retryability::None
        }
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[derive(Debug, Clone)]
pub(crate) enum OperationBody {
    Find(Find),
    GetMore(GetMore),
    KillCursors(KillCursors),
    Aggregate(Aggregate),
    Count(Count),
    Distinct(Distinct),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    FindAndModify(FindAndModify),
    ListCollections(ListCollections),
    ListDatabases(ListDatabases),
    DropCollection(DropCollection),
    RunCommand(RunCommand),
}

/// Runs the given expression against the kind-specific operation held by an `OperationBody`.
macro_rules! with_body {
    ($body:expr, $op:ident => $e:expr) => {
        match $body {
            OperationBody::Find($op) => $e,
            OperationBody::GetMore($op) => $e,
            OperationBody::KillCursors($op) => $e,
            OperationBody::Aggregate($op) => $e,
            OperationBody::Count($op) => $e,
            OperationBody::Distinct($op) => $e,
            OperationBody::Insert($op) => $e,
            OperationBody::Update($op) => $e,
            OperationBody::Delete($op) => $e,
            OperationBody::FindAndModify($op) => $e,
            OperationBody::ListCollections($op) => $e,
            OperationBody::ListDatabases($op) => $e,
            OperationBody::DropCollection($op) => $e,
            OperationBody::RunCommand($op) => $e,
        }
    };
}

/// A single logical request to the database, ready to be run by
/// [`Client::execute`](crate::Client::execute).
///
/// Operations are built with one of the constructors below. Constructors that take documents
/// supplied by the caller validate them up front, so malformed operations are rejected before
/// any network activity.
#[derive(Debug, Clone)]
pub struct Operation {
    body: OperationBody,
    explain: Option<Explain>,
    ends_transaction: bool,
}

impl From<OperationBody> for Operation {
    fn from(body: OperationBody) -> Self {
        Self {
            body,
            explain: None,
            ends_transaction: false,
        }
    }
}

impl Operation {
    /// Finds the documents in the namespace matching the filter.
    pub fn find(
        ns: Namespace,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<FindOptions>>,
    ) -> Self {
        OperationBody::Find(Find::new(ns, filter.into(), options.into())).into()
    }

    /// Requests the next batch of the cursor described by `info`. Fails if the cursor has already
    /// been exhausted.
    pub fn get_more(info: CursorInformation) -> Result<Self> {
        Ok(OperationBody::GetMore(GetMore::new(info)?).into())
    }

    /// Closes the given cursor on the server it lives on.
    pub fn kill_cursors(info: &CursorInformation) -> Self {
        OperationBody::KillCursors(KillCursors::new(
            info.ns.clone(),
            vec![info.id],
            info.address.clone(),
        ))
        .into()
    }

    /// Runs an aggregation pipeline against the namespace. A namespace without a collection runs
    /// a database-level aggregation.
    pub fn aggregate(
        ns: Namespace,
        pipeline: impl IntoIterator<Item = Document>,
        options: impl Into<Option<AggregateOptions>>,
    ) -> Self {
        OperationBody::Aggregate(Aggregate::new(ns, pipeline, options.into())).into()
    }

    /// Counts the documents matching the filter using collection metadata and the `count`
    /// command.
    pub fn count(
        ns: Namespace,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<CountOptions>>,
    ) -> Self {
        OperationBody::Count(Count::new(ns, filter.into(), options.into())).into()
    }

    /// Finds the distinct values of a field among the documents matching the filter.
    pub fn distinct(
        ns: Namespace,
        field_name: impl Into<String>,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<DistinctOptions>>,
    ) -> Self {
        OperationBody::Distinct(Distinct::new(
            ns,
            field_name.into(),
            filter.into(),
            options.into(),
        ))
        .into()
    }

    /// Inserts a single document, generating an `_id` for it if it has none.
    pub fn insert_one<T: Serialize>(
        ns: Namespace,
        document: &T,
        options: impl Into<Option<InsertOptions>>,
    ) -> Result<Self> {
        let document = serde_util::to_document(document)?;
        Ok(OperationBody::Insert(Insert::new(ns, vec![document], true, options.into())?).into())
    }

    /// Inserts the given documents, generating an `_id` for each one that has none.
    pub fn insert_many<T: Serialize>(
        ns: Namespace,
        documents: impl IntoIterator<Item = T>,
        options: impl Into<Option<InsertOptions>>,
    ) -> Result<Self> {
        let documents = documents
            .into_iter()
            .map(|document| serde_util::to_document(&document))
            .collect::<Result<Vec<_>>>()?;
        Ok(OperationBody::Insert(Insert::new(ns, documents, false, options.into())?).into())
    }

    /// Updates the first document matching the query. The update must consist of atomic
    /// operators.
    pub fn update_one(
        ns: Namespace,
        query: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<Self> {
        Ok(OperationBody::Update(Update::with_update(
            ns,
            query,
            update.into(),
            false,
            options.into(),
        )?)
        .into())
    }

    /// Updates every document matching the query. The update must consist of atomic operators.
    pub fn update_many(
        ns: Namespace,
        query: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<UpdateOptions>>,
    ) -> Result<Self> {
        Ok(OperationBody::Update(Update::with_update(
            ns,
            query,
            update.into(),
            true,
            options.into(),
        )?)
        .into())
    }

    /// Replaces the first document matching the query. The replacement must not contain atomic
    /// operators.
    pub fn replace_one<T: Serialize>(
        ns: Namespace,
        query: Document,
        replacement: &T,
        options: impl Into<Option<ReplaceOptions>>,
    ) -> Result<Self> {
        let replacement = serde_util::to_document(replacement)?;
        Ok(OperationBody::Update(Update::with_replace(
            ns,
            query,
            replacement,
            options.into().map(UpdateOptions::from_replace_options),
        )?)
        .into())
    }

    /// Deletes the first document matching the query.
    pub fn delete_one(
        ns: Namespace,
        query: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Self {
        OperationBody::Delete(Delete::new(ns, query, true, options.into())).into()
    }

    /// Deletes every document matching the query.
    pub fn delete_many(
        ns: Namespace,
        query: Document,
        options: impl Into<Option<DeleteOptions>>,
    ) -> Self {
        OperationBody::Delete(Delete::new(ns, query, false, options.into())).into()
    }

    /// Atomically finds and deletes a document.
    pub fn find_one_and_delete(
        ns: Namespace,
        filter: Document,
        options: impl Into<Option<FindOneAndDeleteOptions>>,
    ) -> Self {
        OperationBody::FindAndModify(FindAndModify::with_delete(ns, filter, options.into())).into()
    }

    /// Atomically finds and updates a document. The update must consist of atomic operators.
    pub fn find_one_and_update(
        ns: Namespace,
        filter: Document,
        update: impl Into<UpdateModifications>,
        options: impl Into<Option<FindOneAndUpdateOptions>>,
    ) -> Result<Self> {
        Ok(OperationBody::FindAndModify(FindAndModify::with_update(
            ns,
            filter,
            update.into(),
            options.into(),
        )?)
        .into())
    }

    /// Atomically finds and replaces a document. The replacement must not contain atomic
    /// operators.
    pub fn find_one_and_replace<T: Serialize>(
        ns: Namespace,
        filter: Document,
        replacement: &T,
        options: impl Into<Option<FindOneAndReplaceOptions>>,
    ) -> Result<Self> {
        let replacement = serde_util::to_document(replacement)?;
        Ok(OperationBody::FindAndModify(FindAndModify::with_replace(
            ns,
            filter,
            replacement,
            options.into(),
        )?)
        .into())
    }

    /// Lists the collections in a database.
    pub fn list_collections(
        db: impl Into<String>,
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<ListCollectionsOptions>>,
    ) -> Self {
        OperationBody::ListCollections(ListCollections::new(
            db.into(),
            filter.into(),
            options.into(),
        ))
        .into()
    }

    /// Lists the databases of the deployment.
    pub fn list_databases(
        filter: impl Into<Option<Document>>,
        options: impl Into<Option<ListDatabasesOptions>>,
    ) -> Self {
        OperationBody::ListDatabases(ListDatabases::new(filter.into(), options.into())).into()
    }

    /// Drops a collection. Dropping a collection that does not exist succeeds.
    pub fn drop_collection(
        ns: Namespace,
        options: impl Into<Option<DropCollectionOptions>>,
    ) -> Result<Self> {
        Ok(OperationBody::DropCollection(DropCollection::new(ns, options.into())?).into())
    }

    /// Runs an arbitrary command against a database. The first key of the document names the
    /// command; the document is sent as-is apart from session fields.
    pub fn run_command(
        db: impl Into<String>,
        command: Document,
        read_preference: impl Into<Option<ReadPreference>>,
    ) -> Result<Self> {
        Ok(
            OperationBody::RunCommand(RunCommand::new(db.into(), command, read_preference.into())?)
                .into(),
        )
    }

    /// The command ending the transaction of a session.
    pub(crate) fn end_transaction(
        command: Document,
        write_concern: Option<WriteConcern>,
    ) -> Result<Self> {
        let run_command = RunCommand::new("admin".to_string(), command, None)?
            .with_write_concern(write_concern);
        let mut operation: Self = OperationBody::RunCommand(run_command).into();
        operation.ends_transaction = true;
        Ok(operation)
    }

    /// Asks the server to explain this operation instead of running it. The output of an
    /// explained operation is the raw reply, as [`OperationOutput::Command`].
    pub fn with_explain(mut self, explain: impl Into<Explain>) -> Result<Self> {
        if !self.has_aspect(Aspects::EXPLAINABLE) {
            return Err(Error::invalid_argument(format!(
                "{} does not support explain",
                self.kind()
            )));
        }
        self.explain = Some(explain.into());
        Ok(self)
    }

    /// The kind of this operation.
    pub fn kind(&self) -> OperationKind {
        fn kind_of<T: OperationWithDefaults>(_: &T) -> OperationKind {
            T::KIND
        }
        with_body!(&self.body, op => kind_of(op))
    }

    /// The capabilities of this operation's kind.
    pub fn aspects(&self) -> Aspects {
        self.kind().aspects()
    }

    /// Whether this operation's kind has the given aspect.
    pub fn has_aspect(&self, aspect: Aspects) -> bool {
        self.kind().has_aspect(aspect)
    }

    /// The name of the command this operation runs.
    pub fn name(&self) -> &str {
        with_body!(&self.body, op => op.name())
    }

    /// The explain request attached to this operation, if any.
    pub fn explain(&self) -> Option<&Explain> {
        self.explain.as_ref()
    }

    pub(crate) fn ends_transaction(&self) -> bool {
        self.ends_transaction
    }

    pub(crate) fn read_preference(&self) -> Option<&ReadPreference> {
        with_body!(&self.body, op => op.read_preference())
    }

    pub(crate) fn write_concern(&self) -> Option<&WriteConcern> {
        with_body!(&self.body, op => op.write_concern())
    }

    pub(crate) fn is_acknowledged(&self) -> bool {
        with_body!(&self.body, op => op.is_acknowledged())
    }

    pub(crate) fn secondary_writable(&self) -> bool {
        with_body!(&self.body, op => op.secondary_writable())
    }

    pub(crate) fn bound_server(&self) -> Option<&ServerAddress> {
        with_body!(&self.body, op => op.bound_server())
    }

    pub(crate) fn retryability(&self) -> Retryability {
        with_body!(&self.body, op => op.retryability())
    }

    /// Fills in the concerns the operation did not specify from the client defaults.
    pub(crate) fn inherit_concerns(&mut self, options: &ClientOptions) {
        with_body!(&mut self.body, op => {
            if op.read_concern().is_none() {
                if let Some(ref read_concern) = options.read_concern {
                    op.set_read_concern(read_concern.clone());
                }
            }
            if op.write_concern().is_none() {
                if let Some(ref write_concern) = options.write_concern {
                    op.set_write_concern(write_concern.clone());
                }
            }
        })
    }

    /// Checks the operation once its concerns are final.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(write_concern) = self.write_concern() {
            write_concern.validate()?;
        }
        if self.explain.is_some()
            && self.kind() == OperationKind::Aggregate
            && self
                .write_concern()
                .is_some_and(|write_concern| !write_concern.is_empty())
        {
            return Err(Error::incompatible_server(
                "explain does not support a write concern on aggregate",
            ));
        }
        with_body!(&self.body, op => op.validate())
    }

    /// Renders the full command for the given dispatch target, minus the session fields.
    pub(crate) fn build_command(&self, context: &BuildContext) -> Result<Command> {
        let kind = self.kind();
        with_body!(&self.body, op => {
            let mut command = op.build(context)?;

            if !kind.has_aspect(Aspects::SKIP_COLLATION) {
                if let Some(collation) = op.collation() {
                    command.set_collation(collation.to_document()?);
                }
            }

            if !context.in_transaction && op.supports_read_concern(context) {
                if let Some(read_concern) = op.read_concern() {
                    command.set_read_concern(read_concern)?;
                }
            }

            if !context.in_transaction && op.attaches_write_concern() {
                if let Some(write_concern) = op.write_concern() {
                    command.set_write_concern(write_concern)?;
                }
            }

            if let Some(ref explain) = self.explain {
                command.wrap_in_explain(explain);
            }

            Ok(command)
        })
    }

    pub(crate) fn handle_response(
        &self,
        response: Document,
        description: &ServerDescription,
    ) -> Result<OperationOutput> {
        if self.explain.is_some() {
            return Ok(OperationOutput::Command(response));
        }
        with_body!(&self.body, op => op.handle_response(response, description))
    }

    pub(crate) fn handle_error(&self, error: Error) -> Result<OperationOutput> {
        with_body!(&self.body, op => op.handle_error(error))
    }
}

/// A response body useful for deserializing command errors.
#[derive(Deserialize, Debug)]
pub(crate) struct CommandErrorBody {
    #[serde(rename = "errorLabels")]
    pub(crate) error_labels: Option<Vec<String>>,

    #[serde(flatten)]
    pub(crate) command_error: CommandError,
}

impl From<CommandErrorBody> for Error {
    fn from(command_error_response: CommandErrorBody) -> Error {
        Error::new(
            ErrorKind::Command(command_error_response.command_error),
            command_error_response.error_labels,
        )
    }
}

/// Appends a serializable struct to the input document. The serializable struct MUST serialize to a
/// Document; otherwise, an error will be thrown.
pub(crate) fn append_options<T: Serialize + Debug>(
    doc: &mut Document,
    options: Option<&T>,
) -> Result<()> {
    if let Some(options) = options {
        let options_doc = serde_util::to_document(options)?;
        doc.extend(options_doc);
    }
    Ok(())
}

/// Deserializes a reply body, reporting shape mismatches as invalid responses.
pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(response: Document) -> Result<T> {
    crate::bson::from_document(response)
        .map_err(|e| Error::invalid_response(format!("unexpected reply shape: {e}")))
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct EmptyBody {}

/// Body of a write response that could possibly have a write concern error but not write errors.
#[derive(Debug, Deserialize, Default, Clone)]
pub(crate) struct WriteConcernOnlyBody {
    #[serde(rename = "writeConcernError")]
    write_concern_error: Option<WriteConcernError>,

    #[serde(rename = "errorLabels")]
    labels: Option<Vec<String>>,
}

impl WriteConcernOnlyBody {
    pub(crate) fn validate(&self) -> Result<()> {
        match self.write_concern_error {
            Some(ref wc_error) => Err(Error::new(
                ErrorKind::Write(WriteFailure::WriteConcernError(wc_error.clone())),
                self.labels.clone(),
            )),
            None => Ok(()),
        }
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct WriteResponseBody<T = EmptyBody> {
    #[serde(flatten)]
    body: T,

    #[serde(deserialize_with = "serde_util::deserialize_u64_from_bson_number")]
    n: u64,

    #[serde(rename = "writeErrors")]
    write_errors: Option<Vec<IndexedWriteError>>,

    #[serde(rename = "writeConcernError")]
    write_concern_error: Option<WriteConcernError>,

    #[serde(rename = "errorLabels")]
    labels: Option<Vec<String>>,
}

impl<T> WriteResponseBody<T> {
    fn validate(&self) -> Result<()> {
        if self.write_errors.is_none() && self.write_concern_error.is_none() {
            return Ok(());
        };

        let failure = InsertManyError {
            write_errors: self.write_errors.clone(),
            write_concern_error: self.write_concern_error.clone(),
            inserted_ids: Default::default(),
        };

        Err(Error::new(
            ErrorKind::InsertMany(failure),
            self.labels.clone(),
        ))
    }
}
