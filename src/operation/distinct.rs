use serde::Deserialize;

use crate::{
    bson::{doc, Bson, Document},
    collation::Collation,
    concern::ReadConcern,
    error::Result,
    operation::{
        append_options,
        parse_body,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
    },
    options::{DistinctOptions, ReadPreference},
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct Distinct {
    ns: Namespace,
    field_name: String,
    query: Option<Document>,
    options: Option<DistinctOptions>,
}

impl Distinct {
    pub(crate) fn new(
        ns: Namespace,
        field_name: String,
        query: Option<Document>,
        options: Option<DistinctOptions>,
    ) -> Self {
        Distinct {
            ns,
            field_name,
            query,
            options,
        }
    }
}

impl OperationWithDefaults for Distinct {
    const NAME: &'static str = "distinct";
    const KIND: OperationKind = OperationKind::Distinct;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
            "key": self.field_name.as_str(),
        };

        if let Some(ref query) = self.query {
            body.insert("query", query.clone());
        }

        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        let response: Response = parse_body(response)?;
        Ok(OperationOutput::Distinct(response.values))
    }

    fn read_preference(&self) -> Option<&ReadPreference> {
        self.options
            .as_ref()
            .and_then(|opts| opts.read_preference.as_ref())
    }

    fn read_concern(&self) -> Option<&ReadConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.read_concern.as_ref())
    }

    fn set_read_concern(&mut self, read_concern: ReadConcern) {
        self.options.get_or_insert_with(Default::default).read_concern = Some(read_concern);
    }

    fn collation(&self) -> Option<&Collation> {
        self.options.as_ref().and_then(|opts| opts.collation.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    values: Vec<Bson>,
}
