use crate::{
    bson::{doc, Document},
    concern::WriteConcern,
    error::{Error, Result},
    operation::{
        append_options,
        parse_body,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
        WriteConcernOnlyBody,
    },
    options::DropCollectionOptions,
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct DropCollection {
    ns: Namespace,
    options: Option<DropCollectionOptions>,
}

impl DropCollection {
    pub(crate) fn new(ns: Namespace, options: Option<DropCollectionOptions>) -> Result<Self> {
        ns.collection_for(Self::NAME)?;
        Ok(DropCollection { ns, options })
    }
}

impl OperationWithDefaults for DropCollection {
    const NAME: &'static str = "drop";
    const KIND: OperationKind = OperationKind::DropCollection;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
        };

        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        let response: WriteConcernOnlyBody = parse_body(response)?;
        response.validate()?;
        Ok(OperationOutput::Unit)
    }

    fn handle_error(&self, error: Error) -> Result<OperationOutput> {
        if error.is_ns_not_found() {
            Ok(OperationOutput::Unit)
        } else {
            Err(error)
        }
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }

    fn set_write_concern(&mut self, write_concern: WriteConcern) {
        self.options.get_or_insert_with(Default::default).write_concern = Some(write_concern);
    }
}
