
use serde::Deserialize;

use crate::{
    bson::{doc, Bson, Document},
    bson_util,
    concern::WriteConcern,
    error::{convert_insert_many_error, Error, Result},
    operation::{
        append_options,
        parse_body,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
        WriteResponseBody,
    },
    options::{UpdateModifications, UpdateOptions},
    results::UpdateResult,
    sdam::ServerDescription,
    serde_util,
    Namespace,
};

#[derive(Clone, Debug)]
pub(crate) enum UpdateOrReplace {
    UpdateModifications(UpdateModifications),
    Replacement(Document),
}

impl UpdateOrReplace {
    pub(crate) fn to_bson(&self) -> Bson {
        match self {
            Self::UpdateModifications(update_modifications) => update_modifications.to_bson(),
            Self::Replacement(replacement) => Bson::Document(replacement.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Update {
    ns: Namespace,
    filter: Document,
    update: UpdateOrReplace,
    multi: Option<bool>,
    options: Option<UpdateOptions>,
}

impl Update {
    pub(crate) fn with_update(
        ns: Namespace,
        filter: Document,
        update: UpdateModifications,
        multi: bool,
        options: Option<UpdateOptions>,
    ) -> Result<Self> {
        update.validate()?;

        Ok(Self {
            ns,
            filter,
            update: UpdateOrReplace::UpdateModifications(update),
            multi: multi.then_some(true),
            options,
        })
    }

    pub(crate) fn with_replace(
        ns: Namespace,
        filter: Document,
        replacement: Document,
        options: Option<UpdateOptions>,
    ) -> Result<Self> {
        bson_util::replacement_document_check(&replacement)?;

        Ok(Self {
            ns,
            filter,
            update: UpdateOrReplace::Replacement(replacement),
            multi: None,
            options,
        })
    }
}

impl OperationWithDefaults for Update {
    const NAME: &'static str = "update";
    const KIND: OperationKind = OperationKind::Update;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
        };

        let mut update = doc! {
            "q": self.filter.clone(),
            "u": self.update.to_bson(),
        };

        if let Some(ref options) = self.options {
            if let Some(upsert) = options.upsert {
                update.insert("upsert", upsert);
            }

            if let Some(ref array_filters) = options.array_filters {
                update.insert("arrayFilters", bson_util::to_bson_array(array_filters));
            }

            if let Some(ref hint) = options.hint {
                update.insert("hint", hint.to_bson());
            }

            if let Some(ref collation) = options.collation {
                update.insert("collation", collation.to_document()?);
            }
        };

        if let Some(multi) = self.multi {
            update.insert("multi", multi);
        }

        body.insert("updates", vec![update]);
        // A single statement is always ordered.
        body.insert("ordered", true);

        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        if !self.is_acknowledged() {
            return Ok(OperationOutput::Update(UpdateResult::default()));
        }

        let response: WriteResponseBody<UpdateBody> = parse_body(response)?;
        response.validate().map_err(convert_insert_many_error)?;

        let modified_count = response.body.n_modified;
        let upserted_id = response
            .body
            .upserted
            .as_ref()
            .and_then(|v| v.first())
            .and_then(|doc| doc.get("_id"))
            .cloned();

        let matched_count = if upserted_id.is_some() {
            0
        } else {
            response.n
        };

        Ok(OperationOutput::Update(UpdateResult {
            matched_count,
            modified_count,
            upserted_id,
        }))
    }

    fn validate(&self) -> Result<()> {
        let hinted = self
            .options
            .as_ref()
            .is_some_and(|opts| opts.hint.is_some());
        if hinted && !self.is_acknowledged() {
            return Err(Error::incompatible_server(
                "hint is not supported with an unacknowledged write concern",
            ));
        }
        Ok(())
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }

    fn set_write_concern(&mut self, write_concern: WriteConcern) {
        self.options.get_or_insert_with(Default::default).write_concern = Some(write_concern);
    }

    fn can_retry_write(&self) -> bool {
        self.multi != Some(true)
    }
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct UpdateBody {
    #[serde(
        rename = "nModified",
        default,
        deserialize_with = "serde_util::deserialize_u64_from_bson_number"
    )]
    n_modified: u64,
    upserted: Option<Vec<Document>>,
}
