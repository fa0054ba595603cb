use serde::Deserialize;

use crate::{
    bson::{doc, Document},
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
    options::{CountOptions, ReadPreference},
    sdam::ServerDescription,
    serde_util,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct Count {
    ns: Namespace,
    query: Option<Document>,
    options: Option<CountOptions>,
}

impl Count {
    pub(crate) fn new(ns: Namespace, query: Option<Document>, options: Option<CountOptions>) -> Self {
        Count { ns, query, options }
    }
}

impl OperationWithDefaults for Count {
    const NAME: &'static str = "count";
    const KIND: OperationKind = OperationKind::Count;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
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
        let response: ResponseBody = parse_body(response)?;
        Ok(OperationOutput::Count(response.n))
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
struct ResponseBody {
    #[serde(deserialize_with = "serde_util::deserialize_u64_from_bson_number")]
    n: u64,
}
