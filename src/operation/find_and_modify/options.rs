use std::time::Duration;

use serde::Serialize;

use crate::{
    bson::{Bson, Document},
    collation::Collation,
    concern::WriteConcern,
    options::{
        FindOneAndDeleteOptions,
        FindOneAndReplaceOptions,
        FindOneAndUpdateOptions,
        Hint,
        ReturnDocument,
        Sort,
    },
    serde_util,
};

/// The options shared by the three `findAndModify` variants, in the shape the command expects.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FindAndModifyOptions {
    #[serde(skip)]
    pub(crate) sort: Option<Sort>,

    pub(crate) new: Option<bool>,

    pub(crate) upsert: Option<bool>,

    pub(crate) bypass_document_validation: Option<bool>,

    #[serde(skip)]
    pub(crate) write_concern: Option<WriteConcern>,

    pub(crate) array_filters: Option<Vec<Document>>,

    #[serde(
        serialize_with = "serde_util::serialize_duration_option_as_int_millis",
        rename = "maxTimeMS"
    )]
    pub(crate) max_time: Option<Duration>,

    #[serde(rename = "fields")]
    pub(crate) projection: Option<Document>,

    #[serde(skip)]
    pub(crate) collation: Option<Collation>,

    pub(crate) hint: Option<Hint>,

    #[serde(rename = "let")]
    pub(crate) let_vars: Option<Document>,

    pub(crate) comment: Option<Bson>,
}

impl From<FindOneAndDeleteOptions> for FindAndModifyOptions {
    fn from(options: FindOneAndDeleteOptions) -> Self {
        Self {
            sort: options.sort,
            write_concern: options.write_concern,
            max_time: options.max_time,
            projection: options.projection,
            collation: options.collation,
            hint: options.hint,
            let_vars: options.let_vars,
            comment: options.comment,
            ..Default::default()
        }
    }
}

impl From<FindOneAndUpdateOptions> for FindAndModifyOptions {
    fn from(options: FindOneAndUpdateOptions) -> Self {
        Self {
            sort: options.sort,
            new: return_document_to_bool(options.return_document),
            upsert: options.upsert,
            bypass_document_validation: options.bypass_document_validation,
            write_concern: options.write_concern,
            array_filters: options.array_filters,
            max_time: options.max_time,
            projection: options.projection,
            collation: options.collation,
            hint: options.hint,
            let_vars: options.let_vars,
            comment: options.comment,
        }
    }
}

impl From<FindOneAndReplaceOptions> for FindAndModifyOptions {
    fn from(options: FindOneAndReplaceOptions) -> Self {
        Self {
            sort: options.sort,
            new: return_document_to_bool(options.return_document),
            upsert: options.upsert,
            bypass_document_validation: options.bypass_document_validation,
            write_concern: options.write_concern,
            array_filters: None,
            max_time: options.max_time,
            projection: options.projection,
            collation: options.collation,
            hint: options.hint,
            let_vars: options.let_vars,
            comment: options.comment,
        }
    }
}

fn return_document_to_bool(return_document: Option<ReturnDocument>) -> Option<bool> {
    return_document.map(|return_document| matches!(return_document, ReturnDocument::After))
}
