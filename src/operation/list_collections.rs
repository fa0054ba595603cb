use crate::{
    bson::{doc, Document},
    cursor::CursorSpecification,
    error::{Error, Result},
    operation::{
        append_options,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
    },
    options::ListCollectionsOptions,
    sdam::ServerDescription,
};

#[derive(Debug, Clone)]
pub(crate) struct ListCollections {
    db: String,
    filter: Option<Document>,
    options: Option<ListCollectionsOptions>,
}

impl ListCollections {
    pub(crate) fn new(
        db: String,
        filter: Option<Document>,
        options: Option<ListCollectionsOptions>,
    ) -> Self {
        Self {
            db,
            filter,
            options,
        }
    }

    /// `nameOnly` can only be honored when the filter looks at nothing but the name.
    fn name_only(&self) -> Option<bool> {
        let requested = self.options.as_ref().and_then(|opts| opts.name_only)?;
        let filters_other_fields = self
            .filter
            .as_ref()
            .is_some_and(|filter| filter.keys().any(|key| key != "name"));
        Some(requested && !filters_other_fields)
    }
}

impl OperationWithDefaults for ListCollections {
    const NAME: &'static str = "listCollections";
    const KIND: OperationKind = OperationKind::ListCollections;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: 1,
        };

        if let Some(ref filter) = self.filter {
            body.insert("filter", filter.clone());
        }

        let mut cursor = Document::new();
        if let Some(batch_size) = self.options.as_ref().and_then(|opts| opts.batch_size) {
            let batch_size = i32::try_from(batch_size).map_err(|_| {
                Error::invalid_argument("The batch size must fit into a signed 32-bit integer")
            })?;
            cursor.insert("batchSize", batch_size);
        }
        body.insert("cursor", cursor);

        append_options(&mut body, self.options.as_ref())?;

        if let Some(name_only) = self.name_only() {
            body.insert("nameOnly", name_only);
        }

        Ok(Command::new(Self::NAME, &self.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        description: &ServerDescription,
    ) -> Result<OperationOutput> {
        let spec = CursorSpecification::from_reply(
            response,
            description.address.clone(),
            self.options.as_ref().and_then(|opts| opts.batch_size),
            None,
            None,
        )?;
        Ok(OperationOutput::Cursor(spec))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{
        bson::doc,
        operation::{
            test::{assert_body, handle_response_test},
            Operation,
            OperationOutput,
        },
        options::ListCollectionsOptions,
        retry::Retryability,
    };

    #[test]
    fn build() {
        let options = ListCollectionsOptions::builder()
            .batch_size(5u32)
            .name_only(true)
            .authorized_collections(true)
            .build();
        let op = Operation::list_collections("test_db", doc! { "name": "users" }, options);

        assert_body(
            &op,
            doc! {
                "listCollections": 1,
                "filter": { "name": "users" },
                "cursor": { "batchSize": 5 },
                "nameOnly": true,
                "authorizedCollections": true,
            },
        );
        assert_eq!(op.retryability(), Retryability::Read);
    }

    #[test]
    fn name_only_dropped_for_other_filters() {
        let options = ListCollectionsOptions::builder().name_only(true).build();
        let op = Operation::list_collections("test_db", doc! { "type": "view" }, options);

        assert_body(
            &op,
            doc! {
                "listCollections": 1,
                "filter": { "type": "view" },
                "cursor": {},
                "nameOnly": false,
            },
        );
    }

    #[test]
    fn handle_success() {
        let op = Operation::list_collections("test_db", None, None);

        let OperationOutput::Cursor(spec) = handle_response_test(
            &op,
            doc! {
                "ok": 1,
                "cursor": {
                    "id": 0i64,
                    "ns": "test_db.$cmd.listCollections",
                    "firstBatch": [{ "name": "users", "type": "collection" }],
                },
            },
        )
        .unwrap() else {
            panic!("expected cursor output");
        };
        assert_eq!(spec.id(), 0);
        assert_eq!(spec.info.ns.db, "test_db");
        assert_eq!(spec.initial_buffer.len(), 1);
    }
}
