
use crate::{
    bson::{doc, Bson, Document},
    bson_util,
    collation::Collation,
    concern::{ReadConcern, WriteConcern},
    cursor::CursorSpecification,
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
        SERVER_4_2_0_WIRE_VERSION,
        SERVER_4_4_0_WIRE_VERSION,
    },
    options::{AggregateOptions, ReadPreference},
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct Aggregate {
    target: Namespace,
    pipeline: Vec<Document>,
    options: Option<AggregateOptions>,
}

impl Aggregate {
    pub(crate) fn new(
        target: Namespace,
        pipeline: impl IntoIterator<Item = Document>,
        options: Option<AggregateOptions>,
    ) -> Self {
        Self {
            target,
            pipeline: pipeline.into_iter().collect(),
            options,
        }
    }

    /// Returns whether this is a $out or $merge aggregation operation.
    fn is_out_or_merge(&self) -> bool {
        self.pipeline
            .last()
            .map(|stage| {
                let stage = bson_util::first_key(stage);
                stage == Some("$out") || stage == Some("$merge")
            })
            .unwrap_or(false)
    }

    /// The value of the command's first field: the collection name, or `1` for database-level
    /// aggregations.
    fn target_bson(&self) -> Bson {
        match self.target.coll {
            Some(ref coll) => Bson::String(coll.clone()),
            None => Bson::Int32(1),
        }
    }
}

impl OperationWithDefaults for Aggregate {
    const NAME: &'static str = "aggregate";
    const KIND: OperationKind = OperationKind::Aggregate;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut cursor = Document::new();
        if !self.is_out_or_merge() {
            if let Some(batch_size) = self.options.as_ref().and_then(|opts| opts.batch_size) {
                let batch_size = i32::try_from(batch_size).map_err(|_| {
                    Error::invalid_argument("The batch size must fit into a signed 32-bit integer")
                })?;
                cursor.insert("batchSize", batch_size);
            }
        }

        let mut body = doc! {
            Self::NAME: self.target_bson(),
            "pipeline": bson_util::to_bson_array(&self.pipeline),
            "cursor": cursor,
        };

        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, &self.target.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        description: &ServerDescription,
    ) -> Result<OperationOutput> {
        if self.is_out_or_merge() {
            let wc_error_info: WriteConcernOnlyBody = parse_body(response.clone())?;
            wc_error_info.validate()?;
        };

        // The comment is only propagated to getMore on 4.4+.
        let comment = if description.max_wire_version.unwrap_or(0) < SERVER_4_4_0_WIRE_VERSION {
            None
        } else {
            self.options.as_ref().and_then(|opts| opts.comment.clone())
        };

        let spec = CursorSpecification::from_reply(
            response,
            description.address.clone(),
            self.options.as_ref().and_then(|opts| opts.batch_size),
            self.options.as_ref().and_then(|opts| opts.max_await_time),
            comment,
        )?;
        Ok(OperationOutput::Cursor(spec))
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

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }

    fn set_write_concern(&mut self, write_concern: WriteConcern) {
        if self.is_out_or_merge() {
            self.options.get_or_insert_with(Default::default).write_concern = Some(write_concern);
        }
    }

    fn collation(&self) -> Option<&Collation> {
        self.options.as_ref().and_then(|opts| opts.collation.as_ref())
    }

    fn supports_read_concern(&self, context: &BuildContext) -> bool {
        // for aggregates that write, read concern is supported in MongoDB 4.2+.
        !self.is_out_or_merge() || context.max_wire_version >= SERVER_4_2_0_WIRE_VERSION
    }

    fn attaches_write_concern(&self) -> bool {
        self.is_out_or_merge()
    }

    fn can_retry_read(&self) -> bool {
        !self.is_out_or_merge()
    }

    fn secondary_writable(&self) -> bool {
        self.is_out_or_merge()
    }
}
