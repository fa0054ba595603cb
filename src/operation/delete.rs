use crate::{
    bson::{doc, Document},
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
    options::DeleteOptions,
    results::DeleteResult,
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct Delete {
    ns: Namespace,
    filter: Document,
    single: bool,
    options: Option<DeleteOptions>,
}

impl Delete {
    pub(crate) fn new(
        ns: Namespace,
        filter: Document,
        single: bool,
        options: Option<DeleteOptions>,
    ) -> Self {
        Self {
            ns,
            filter,
            single,
            options,
        }
    }
}

impl OperationWithDefaults for Delete {
    const NAME: &'static str = "delete";
    const KIND: OperationKind = OperationKind::Delete;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut delete = doc! {
            "q": self.filter.clone(),
            "limit": i32::from(self.single),
        };

        if let Some(ref options) = self.options {
            if let Some(ref collation) = options.collation {
                delete.insert("collation", collation.to_document()?);
            }

            if let Some(ref hint) = options.hint {
                delete.insert("hint", hint.to_bson());
            }
        }

        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
            "deletes": [delete],
            // A single statement is always ordered.
            "ordered": true,
        };

        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        if !self.is_acknowledged() {
            return Ok(OperationOutput::Delete(DeleteResult::default()));
        }

        let response: WriteResponseBody = parse_body(response)?;
        response.validate().map_err(convert_insert_many_error)?;

        Ok(OperationOutput::Delete(DeleteResult {
            deleted_count: response.n,
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
        self.single
    }
}
