use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::{doc, Bson, Document},
    collation::Collation,
    concern::{ReadConcern, WriteConcern},
    error::{Error, Result},
    selection_criteria::ReadPreference,
    serde_util,
};

/// Specifies the index to use for an operation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Hint {
    /// Specifies the keys of the index to use.
    Keys(Document),
    /// Specifies the name of the index to use.
    Name(String),
}

impl Hint {
    pub(crate) fn to_bson(&self) -> Bson {
        match self {
            Hint::Keys(ref d) => Bson::Document(d.clone()),
            Hint::Name(ref s) => Bson::String(s.clone()),
        }
    }
}

impl From<Document> for Hint {
    fn from(keys: Document) -> Self {
        Self::Keys(keys)
    }
}

impl From<&str> for Hint {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Hint {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Specifies the type of cursor to return from a find operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CursorType {
    /// Default; close the cursor after the last document is received from the server.
    NonTailable,

    /// Do not close the cursor after the last document is received from the server. If more
    /// results become available later, the cursor will return them.
    Tailable,

    /// Similar to `Tailable`, except that the cursor should block on receiving more results if
    /// none are available.
    TailableAwait,
}

/// The direction of one sort key.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SortDirection {
    /// Smallest values first.
    Ascending,
    /// Largest values first.
    Descending,
    /// Sort by a computed value such as `"textScore"`.
    Meta(String),
}

impl SortDirection {
    fn to_bson(&self) -> Bson {
        match self {
            Self::Ascending => Bson::Int32(1),
            Self::Descending => Bson::Int32(-1),
            Self::Meta(meta) => Bson::Document(doc! { "$meta": meta.as_str() }),
        }
    }

    fn from_bson(value: &Bson) -> Result<Self> {
        match value {
            Bson::String(s) => s.parse(),
            Bson::Document(d) if d.contains_key("$meta") => match d.get("$meta") {
                Some(Bson::String(meta)) => Ok(Self::Meta(meta.clone())),
                _ => Err(invalid_sort_direction(value)),
            },
            other => match crate::bson_util::get_int(other) {
                Some(1) => Ok(Self::Ascending),
                Some(-1) => Ok(Self::Descending),
                _ => Err(invalid_sort_direction(value)),
            },
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "asc" | "ascending" => Ok(Self::Ascending),
            "-1" | "desc" | "descending" => Ok(Self::Descending),
            _ => Err(Error::invalid_argument(format!(
                "Invalid sort direction: {s:?}"
            ))),
        }
    }
}

fn invalid_sort_direction(value: &Bson) -> Error {
    Error::invalid_argument(format!("Invalid sort direction: {value}"))
}

/// The order in which the server returns results.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Sort {
    /// A sort document whose values are directions: `1`, `-1`, `"asc"`, `"desc"`,
    /// `"ascending"`, `"descending"` or a `{ $meta: ... }` document.
    Document(Document),
    /// An ordered list of keys and directions.
    Pairs(Vec<(String, SortDirection)>),
    /// A single key sorted in ascending order.
    Field(String),
}

impl Sort {
    /// Renders the canonical sort document, with every direction as `1`, `-1` or a `$meta`
    /// document.
    pub(crate) fn to_document(&self) -> Result<Document> {
        match self {
            Self::Document(sort) => sort
                .iter()
                .map(|(key, value)| {
                    let direction = SortDirection::from_bson(value)?;
                    Ok((key.clone(), direction.to_bson()))
                })
                .collect(),
            Self::Pairs(pairs) => Ok(pairs
                .iter()
                .map(|(key, direction)| (key.clone(), direction.to_bson()))
                .collect()),
            Self::Field(field) => Ok(doc! { field.as_str(): 1 }),
        }
    }
}

impl From<Document> for Sort {
    fn from(sort: Document) -> Self {
        Self::Document(sort)
    }
}

impl From<&str> for Sort {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl From<String> for Sort {
    fn from(field: String) -> Self {
        Self::Field(field)
    }
}

impl From<Vec<(String, SortDirection)>> for Sort {
    fn from(pairs: Vec<(String, SortDirection)>) -> Self {
        Self::Pairs(pairs)
    }
}

/// Limits the fields returned for each document.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Projection {
    /// A projection document.
    Document(Document),
    /// The names of the fields to include.
    Fields(Vec<String>),
}

impl Projection {
    /// Renders the projection document. A field list becomes an inclusion projection; an empty
    /// list keeps only `_id`.
    pub(crate) fn to_document(&self) -> Document {
        match self {
            Self::Document(projection) => projection.clone(),
            Self::Fields(fields) if fields.is_empty() => doc! { "_id": 1 },
            Self::Fields(fields) => fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(1)))
                .collect(),
        }
    }
}

impl From<Document> for Projection {
    fn from(projection: Document) -> Self {
        Self::Document(projection)
    }
}

impl From<Vec<String>> for Projection {
    fn from(fields: Vec<String>) -> Self {
        Self::Fields(fields)
    }
}

impl From<Vec<&str>> for Projection {
    fn from(fields: Vec<&str>) -> Self {
        Self::Fields(fields.into_iter().map(String::from).collect())
    }
}

/// Enum modeling the modifications to apply during an update.
/// For details, see the official MongoDB
/// [documentation](https://www.mongodb.com/docs/manual/reference/command/update/#update-command-behaviors)
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum UpdateModifications {
    /// A document that contains only update operator expressions.
    Document(Document),

    /// An aggregation pipeline.
    Pipeline(Vec<Document>),
}

impl UpdateModifications {
    pub(crate) fn to_bson(&self) -> Bson {
        match self {
            UpdateModifications::Document(ref d) => Bson::Document(d.clone()),
            UpdateModifications::Pipeline(ref p) => crate::bson_util::to_bson_array(p),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            UpdateModifications::Document(d) => crate::bson_util::update_document_check(d),
            UpdateModifications::Pipeline(p) => crate::bson_util::update_pipeline_check(p),
        }
    }
}

impl From<Document> for UpdateModifications {
    fn from(item: Document) -> Self {
        UpdateModifications::Document(item)
    }
}

impl From<Vec<Document>> for UpdateModifications {
    fn from(item: Vec<Document>) -> Self {
        UpdateModifications::Pipeline(item)
    }
}

/// Specifies whether a `findAndModify` update or replacement returns the document before or after
/// modification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReturnDocument {
    /// Return the document after modification.
    After,
    /// Return the document before modification.
    Before,
}

/// The level of detail of an `explain` reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExplainVerbosity {
    /// Information about the winning plan only.
    QueryPlanner,
    /// Also executes the winning plan and reports its statistics.
    ExecutionStats,
    /// Also reports statistics for the rejected plans.
    AllPlansExecution,
}

impl ExplainVerbosity {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::QueryPlanner => "queryPlanner",
            Self::ExecutionStats => "executionStats",
            Self::AllPlansExecution => "allPlansExecution",
        }
    }
}

/// A request to explain an operation instead of running it.
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[non_exhaustive]
pub struct Explain {
    /// How much detail to report.
    #[builder(!default, setter(!strip_option))]
    pub verbosity: ExplainVerbosity,

    /// The time limit for the explain command itself.
    pub max_time: Option<Duration>,
}

impl From<ExplainVerbosity> for Explain {
    fn from(verbosity: ExplainVerbosity) -> Self {
        Self {
            verbosity,
            max_time: None,
        }
    }
}

/// Specifies the options to a `find` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct FindOptions {
    /// Enables writing to temporary files by the server.
    pub allow_disk_use: Option<bool>,

    /// If true, partial results will be returned from a mongos rather than an error being
    /// returned if one or more shards is down.
    pub allow_partial_results: Option<bool>,

    /// The number of documents the server should return per cursor batch. A negative value asks
    /// for a single batch of at most that many documents.
    #[serde(skip)]
    pub batch_size: Option<i32>,

    /// Tags the query with an arbitrary value to help trace the operation through the database
    /// profiler, currentOp and logs.
    pub comment: Option<Bson>,

    /// The type of cursor to return.
    #[serde(skip)]
    pub cursor_type: Option<CursorType>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,

    /// The maximum number of documents to query. A negative value returns a single batch of at
    /// most the absolute value of documents.
    #[serde(skip)]
    pub limit: Option<i64>,

    /// The exclusive upper bound for a specific index.
    pub max: Option<Document>,

    /// The maximum amount of time for the server to wait on new documents to satisfy a
    /// tailable-await cursor's `getMore`.
    #[serde(skip)]
    pub max_await_time: Option<Duration>,

    /// The maximum amount of time to allow the query to run.
    #[serde(
        rename = "maxTimeMS",
        serialize_with = "serde_util::serialize_duration_option_as_int_millis"
    )]
    pub max_time: Option<Duration>,

    /// The inclusive lower bound for a specific index.
    pub min: Option<Document>,

    /// Whether the server should close the cursor after a period of inactivity.
    pub no_cursor_timeout: Option<bool>,

    /// Limits the fields of the document being returned.
    #[serde(skip)]
    pub projection: Option<Projection>,

    /// The read concern to use for this find query.
    #[serde(skip)]
    pub read_concern: Option<ReadConcern>,

    /// Whether to return only the index keys in the documents.
    pub return_key: Option<bool>,

    /// The read preference used to select a server for the operation.
    #[serde(skip)]
    pub read_preference: Option<ReadPreference>,

    /// Whether to return the record identifier for each document.
    pub show_record_id: Option<bool>,

    /// The number of documents to skip before counting.
    pub skip: Option<u64>,

    /// The order of the documents for the purposes of the operation.
    #[serde(skip)]
    pub sort: Option<Sort>,

    /// Whether the server should close the cursor after the first batch.
    #[serde(skip)]
    pub single_batch: Option<bool>,

    /// The collation to use for the operation.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// Variables that can be accessed within the query.
    #[serde(rename = "let")]
    pub let_vars: Option<Document>,
}

/// Specifies the options to an `aggregate` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct AggregateOptions {
    /// Enables writing to temporary files.
    pub allow_disk_use: Option<bool>,

    /// The number of documents the server should return per cursor batch.
    #[serde(skip)]
    pub batch_size: Option<u32>,

    /// Opt out of document-level validation when the pipeline writes its output.
    pub bypass_document_validation: Option<bool>,

    /// The collation to use for the operation.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,

    /// The index to use for the aggregation.
    pub hint: Option<Hint>,

    /// The maximum amount of time for the server to wait on new documents in each `getMore` of
    /// a tailable cursor.
    #[serde(skip)]
    pub max_await_time: Option<Duration>,

    /// The maximum amount of time to allow the query to run.
    #[serde(
        rename = "maxTimeMS",
        serialize_with = "serde_util::serialize_duration_option_as_int_millis"
    )]
    pub max_time: Option<Duration>,

    /// The read concern to use for the operation.
    #[serde(skip)]
    pub read_concern: Option<ReadConcern>,

    /// The read preference used to select a server for the operation.
    #[serde(skip)]
    pub read_preference: Option<ReadPreference>,

    /// The write concern to use when the pipeline ends in `$out` or `$merge`.
    #[serde(skip)]
    pub write_concern: Option<WriteConcern>,

    /// Variables that can be accessed within the pipeline.
    #[serde(rename = "let")]
    pub let_vars: Option<Document>,
}

/// Specifies the options to a `count` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CountOptions {
    /// The index to use for the operation.
    pub hint: Option<Hint>,

    /// The maximum number of documents to count.
    pub limit: Option<u64>,

    /// The maximum amount of time to allow the query to run.
    #[serde(
        rename = "maxTimeMS",
        serialize_with = "serde_util::serialize_duration_option_as_int_millis"
    )]
    pub max_time: Option<Duration>,

    /// The number of documents to skip before counting.
    pub skip: Option<u64>,

    /// The collation to use for the operation.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// The read concern to use for the operation.
    #[serde(skip)]
    pub read_concern: Option<ReadConcern>,

    /// The read preference used to select a server for the operation.
    #[serde(skip)]
    pub read_preference: Option<ReadPreference>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `distinct` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DistinctOptions {
    /// The maximum amount of time to allow the query to run.
    #[serde(
        rename = "maxTimeMS",
        serialize_with = "serde_util::serialize_duration_option_as_int_millis"
    )]
    pub max_time: Option<Duration>,

    /// The collation to use for the operation.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// The read concern to use for the operation.
    #[serde(skip)]
    pub read_concern: Option<ReadConcern>,

    /// The read preference used to select a server for the operation.
    #[serde(skip)]
    pub read_preference: Option<ReadPreference>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to an `insertOne` or `insertMany` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InsertOptions {
    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// If true, when an insert fails, return without performing the remaining writes. If false,
    /// when a write fails, continue with the remaining writes, if any.
    ///
    /// Defaults to true.
    pub ordered: Option<bool>,

    /// The write concern for the operation.
    #[serde(skip)]
    pub write_concern: Option<WriteConcern>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to an update operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UpdateOptions {
    /// A set of filters specifying to which array elements an update should apply.
    #[serde(skip)]
    pub array_filters: Option<Vec<Document>>,

    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// If true, insert a document if no matching document is found.
    #[serde(skip)]
    pub upsert: Option<bool>,

    /// The collation to use for the operation.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// A document or string that specifies the index to use to support the query predicate.
    #[serde(skip)]
    pub hint: Option<Hint>,

    /// The write concern for the operation.
    #[serde(skip)]
    pub write_concern: Option<WriteConcern>,

    /// Map of parameter names and values.
    #[serde(rename = "let")]
    pub let_vars: Option<Document>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

impl UpdateOptions {
    pub(crate) fn from_replace_options(options: ReplaceOptions) -> Self {
        let ReplaceOptions {
            bypass_document_validation,
            upsert,
            collation,
            hint,
            write_concern,
            let_vars,
            comment,
        } = options;

        Self {
            bypass_document_validation,
            upsert,
            collation,
            hint,
            write_concern,
            let_vars,
            comment,
            array_filters: None,
        }
    }
}

/// Specifies the options to a replace operation.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[non_exhaustive]
pub struct ReplaceOptions {
    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// If true, insert a document if no matching document is found.
    pub upsert: Option<bool>,

    /// The collation to use for the operation.
    pub collation: Option<Collation>,

    /// A document or string that specifies the index to use to support the query predicate.
    pub hint: Option<Hint>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// Map of parameter names and values.
    pub let_vars: Option<Document>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a delete operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DeleteOptions {
    /// The collation to use for the operation.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// The write concern for the operation.
    #[serde(skip)]
    pub write_concern: Option<WriteConcern>,

    /// The index to use for the operation.
    #[serde(skip)]
    pub hint: Option<Hint>,

    /// Map of parameter names and values.
    #[serde(rename = "let")]
    pub let_vars: Option<Document>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `findOneAndDelete` operation.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[non_exhaustive]
pub struct FindOneAndDeleteOptions {
    /// The maximum amount of time to allow the query to run.
    pub max_time: Option<Duration>,

    /// Limits the fields of the document being returned.
    pub projection: Option<Document>,

    /// The order of the documents for the purposes of the operation.
    pub sort: Option<Sort>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// The collation to use for the operation.
    pub collation: Option<Collation>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,

    /// Map of parameter names and values.
    pub let_vars: Option<Document>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `findOneAndUpdate` operation.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[non_exhaustive]
pub struct FindOneAndUpdateOptions {
    /// A set of filters specifying to which array elements an update should apply.
    pub array_filters: Option<Vec<Document>>,

    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// The maximum amount of time to allow the query to run.
    pub max_time: Option<Duration>,

    /// Limits the fields of the document being returned.
    pub projection: Option<Document>,

    /// Whether the operation returns the document before or after modification.
    pub return_document: Option<ReturnDocument>,

    /// The order of the documents for the purposes of the operation.
    pub sort: Option<Sort>,

    /// If true, insert a document if no matching document is found.
    pub upsert: Option<bool>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// The collation to use for the operation.
    pub collation: Option<Collation>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,

    /// Map of parameter names and values.
    pub let_vars: Option<Document>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `findOneAndReplace` operation.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[non_exhaustive]
pub struct FindOneAndReplaceOptions {
    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// The maximum amount of time to allow the query to run.
    pub max_time: Option<Duration>,

    /// Limits the fields of the document being returned.
    pub projection: Option<Document>,

    /// Whether the operation returns the document before or after modification.
    pub return_document: Option<ReturnDocument>,

    /// The order of the documents for the purposes of the operation.
    pub sort: Option<Sort>,

    /// If true, insert a document if no matching document is found.
    pub upsert: Option<bool>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// The collation to use for the operation.
    pub collation: Option<Collation>,

    /// The index to use for the operation.
    pub hint: Option<Hint>,

    /// Map of parameter names and values.
    pub let_vars: Option<Document>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `listCollections` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListCollectionsOptions {
    /// The number of documents the server should return per cursor batch.
    #[serde(skip)]
    pub batch_size: Option<u32>,

    /// Whether to return only the names and types of the collections.
    pub name_only: Option<bool>,

    /// Whether to return only the collections the user is authorized to use.
    pub authorized_collections: Option<bool>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `listDatabases` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListDatabasesOptions {
    /// Whether to return only the names of the databases.
    pub name_only: Option<bool>,

    /// Whether to return only the databases the user is authorized to use.
    pub authorized_databases: Option<bool>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}

/// Specifies the options to a `drop` operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into, strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DropCollectionOptions {
    /// The write concern for the operation.
    #[serde(skip)]
    pub write_concern: Option<WriteConcern>,

    /// Tags the query with an arbitrary value.
    pub comment: Option<Bson>,
}
