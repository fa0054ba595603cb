use serde::Deserialize;

use crate::{
    bson::{doc, Document},
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
    options::ListDatabasesOptions,
    sdam::ServerDescription,
};

#[derive(Debug, Clone)]
pub(crate) struct ListDatabases {
    filter: Option<Document>,
    options: Option<ListDatabasesOptions>,
}

impl ListDatabases {
    pub(crate) fn new(filter: Option<Document>, options: Option<ListDatabasesOptions>) -> Self {
        ListDatabases { filter, options }
    }
}

impl OperationWithDefaults for ListDatabases {
    const NAME: &'static str = "listDatabases";
    const KIND: OperationKind = OperationKind::ListDatabases;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: 1,
        };

        if let Some(ref filter) = self.filter {
            body.insert("filter", filter.clone());
        }

        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, "admin", body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        let response: Response = parse_body(response)?;
        Ok(OperationOutput::ListDatabases(response.databases))
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    databases: Vec<Document>,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{
        bson::doc,
        operation::{
            test::{build_test, handle_response_test},
            Operation,
            OperationOutput,
        },
        options::ListDatabasesOptions,
    };

    #[test]
    fn build() {
        let options = ListDatabasesOptions::builder()
            .name_only(true)
            .authorized_databases(false)
            .build();
        let op = Operation::list_databases(doc! { "name": { "$regex": "^app" } }, options);

        let command = build_test(&op);
        assert_eq!(command.target_db, "admin");
        assert_eq!(
            command.body,
            doc! {
                "listDatabases": 1,
                "filter": { "name": { "$regex": "^app" } },
                "nameOnly": true,
                "authorizedDatabases": false,
            }
        );
    }

    #[test]
    fn handle_success() {
        let op = Operation::list_databases(None, None);
        let output = handle_response_test(
            &op,
            doc! {
                "ok": 1,
                "databases": [{ "name": "app", "sizeOnDisk": 8192, "empty": false }],
                "totalSize": 8192,
            },
        )
        .unwrap();
        assert_eq!(
            output,
            OperationOutput::ListDatabases(vec![
                doc! { "name": "app", "sizeOnDisk": 8192, "empty": false }
            ])
        );
    }

    #[test]
    fn missing_databases_is_invalid() {
        let op = Operation::list_databases(None, None);
        assert!(handle_response_test(&op, doc! { "ok": 1 }).is_err());
    }
}
