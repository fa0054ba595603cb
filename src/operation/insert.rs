
use std::collections::HashMap;

use crate::{
    bson::{doc, Bson, Document},
    bson_util::{self, get_or_prepend_id_field},
    concern::WriteConcern,
    error::{convert_insert_many_error, Error, ErrorKind, InsertManyError, Result},
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
    options::InsertOptions,
    results::{InsertManyResult, InsertOneResult},
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct Insert {
    ns: Namespace,
    documents: Vec<Document>,
    inserted_ids: Vec<Bson>,
    single: bool,
    options: InsertOptions,
}

impl Insert {
    /// Creates the operation, giving each document an `_id` up front so that every rendering of
    /// the command sends the same ids.
    pub(crate) fn new(
        ns: Namespace,
        mut documents: Vec<Document>,
        single: bool,
        options: Option<InsertOptions>,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::invalid_argument("No documents provided to insert"));
        }

        let inserted_ids = documents.iter_mut().map(get_or_prepend_id_field).collect();

        let mut options = options.unwrap_or_default();
        if options.ordered.is_none() {
            options.ordered = Some(true);
        }

        Ok(Self {
            ns,
            documents,
            inserted_ids,
            single,
            options,
        })
    }

    fn output(&self, inserted_ids: HashMap<usize, Bson>) -> OperationOutput {
        let result = InsertManyResult { inserted_ids };
        if self.single {
            OperationOutput::InsertOne(InsertOneResult::from_insert_many_result(result))
        } else {
            OperationOutput::InsertMany(result)
        }
    }
}

impl OperationWithDefaults for Insert {
    const NAME: &'static str = "insert";
    const KIND: OperationKind = OperationKind::Insert;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
            "documents": bson_util::to_bson_array(&self.documents),
        };

        append_options(&mut body, Some(&self.options))?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        if !self.is_acknowledged() {
            let all = self.inserted_ids.iter().cloned().enumerate().collect();
            return Ok(self.output(all));
        }

        let response: WriteResponseBody = parse_body(response)?;

        let mut map = HashMap::new();
        if self.options.ordered == Some(true) {
            // in ordered inserts, only the first n were attempted.
            let attempted = usize::try_from(response.n).unwrap_or(usize::MAX);
            for (i, id) in self.inserted_ids.iter().enumerate().take(attempted) {
                map.insert(i, id.clone());
            }
        } else {
            // for unordered, add all the attempted ids and then remove the ones that have
            // associated write errors.
            for (i, id) in self.inserted_ids.iter().enumerate() {
                map.insert(i, id.clone());
            }

            if let Some(write_errors) = response.write_errors.as_ref() {
                for err in write_errors {
                    map.remove(&err.index);
                }
            }
        }

        if response.write_errors.is_some() || response.write_concern_error.is_some() {
            let error = Error::new(
                ErrorKind::InsertMany(InsertManyError {
                    write_errors: response.write_errors,
                    write_concern_error: response.write_concern_error,
                    inserted_ids: map,
                }),
                response.labels,
            );
            return Err(if self.single {
                convert_insert_many_error(error)
            } else {
                error
            });
        }

        Ok(self.output(map))
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options.write_concern.as_ref()
    }

    fn set_write_concern(&mut self, write_concern: WriteConcern) {
        self.options.write_concern = Some(write_concern);
    }
}
