mod options;
#[cfg(test)]
mod test;

use serde::Deserialize;

use self::options::FindAndModifyOptions;
use crate::{
    bson::{doc, Document},
    bson_util,
    collation::Collation,
    concern::WriteConcern,
    error::{Error, Result},
    operation::{
        append_options,
        parse_body,
        update::UpdateOrReplace,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
        WriteConcernOnlyBody,
        SERVER_4_2_0_WIRE_VERSION,
    },
    options::{
        FindOneAndDeleteOptions,
        FindOneAndReplaceOptions,
        FindOneAndUpdateOptions,
        UpdateModifications,
    },
    sdam::ServerDescription,
    Namespace,
};

#[derive(Clone, Debug)]
enum Modification {
    Delete,
    Update(UpdateOrReplace),
}

#[derive(Debug, Clone)]
pub(crate) struct FindAndModify {
    ns: Namespace,
    query: Document,
    modification: Modification,
    options: FindAndModifyOptions,
}

impl FindAndModify {
    pub(crate) fn with_delete(
        ns: Namespace,
        query: Document,
        options: Option<FindOneAndDeleteOptions>,
    ) -> Self {
        Self {
            ns,
            query,
            modification: Modification::Delete,
            options: options.map(Into::into).unwrap_or_default(),
        }
    }

    pub(crate) fn with_update(
        ns: Namespace,
        query: Document,
        update: UpdateModifications,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Self> {
        update.validate()?;

        Ok(Self {
            ns,
            query,
            modification: Modification::Update(UpdateOrReplace::UpdateModifications(update)),
            options: options.map(Into::into).unwrap_or_default(),
        })
    }

    pub(crate) fn with_replace(
        ns: Namespace,
        query: Document,
        replacement: Document,
        options: Option<FindOneAndReplaceOptions>,
    ) -> Result<Self> {
        bson_util::replacement_document_check(&replacement)?;

        Ok(Self {
            ns,
            query,
            modification: Modification::Update(UpdateOrReplace::Replacement(replacement)),
            options: options.map(Into::into).unwrap_or_default(),
        })
    }
}

impl OperationWithDefaults for FindAndModify {
    const NAME: &'static str = "findAndModify";
    const KIND: OperationKind = OperationKind::FindAndModify;

    fn build(&self, context: &BuildContext) -> Result<Command> {
        if self.options.hint.is_some() && context.max_wire_version < SERVER_4_2_0_WIRE_VERSION {
            return Err(Error::incompatible_server(
                "the selected server does not support a hint on findAndModify",
            ));
        }

        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
            "query": self.query.clone(),
        };

        match &self.modification {
            Modification::Delete => {
                body.insert("remove", true);
            }
            Modification::Update(update_or_replace) => {
                body.insert("update", update_or_replace.to_bson());
            }
        }

        if let Some(ref sort) = self.options.sort {
            body.insert("sort", sort.to_document()?);
        }

        append_options(&mut body, Some(&self.options))?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        #[derive(Debug, Deserialize)]
        struct Response {
            value: Option<Document>,
            #[serde(flatten)]
            write_concern: WriteConcernOnlyBody,
        }

        let response: Response = parse_body(response)?;
        response.write_concern.validate()?;

        Ok(OperationOutput::FindAndModify(response.value))
    }

    fn validate(&self) -> Result<()> {
        if self.options.hint.is_some() && !self.is_acknowledged() {
            return Err(Error::incompatible_server(
                "hint is not supported with an unacknowledged write concern",
            ));
        }
        Ok(())
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options.write_concern.as_ref()
    }

    fn set_write_concern(&mut self, write_concern: WriteConcern) {
        self.options.write_concern = Some(write_concern);
    }

    fn collation(&self) -> Option<&Collation> {
        self.options.collation.as_ref()
    }
}
