#[cfg(test)]
mod test;

use crate::{
    bson::{doc, Document},
    collation::Collation,
    concern::ReadConcern,
    cursor::CursorSpecification,
    error::Result,
    operation::{
        append_options,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
        SERVER_4_4_0_WIRE_VERSION,
    },
    options::{CursorType, FindOptions, ReadPreference},
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct Find {
    ns: Namespace,
    filter: Option<Document>,
    options: Option<Box<FindOptions>>,
}

impl Find {
    pub(crate) fn new(ns: Namespace, filter: Option<Document>, options: Option<FindOptions>) -> Self {
        Self {
            ns,
            filter,
            options: options.map(Box::new),
        }
    }

    fn options_mut(&mut self) -> &mut FindOptions {
        self.options.get_or_insert_with(Default::default)
    }
}

/// The `limit`, `batchSize` and `singleBatch` values sent for the requested limit and batch size.
///
/// A negative limit asks for a single batch of at most that many documents. A negative batch size
/// does too, and becomes the limit when it is the tighter bound.
fn limit_and_batch_size(
    limit: Option<i64>,
    batch_size: Option<i32>,
) -> (Option<i64>, Option<i32>, bool) {
    let mut single_batch = false;

    let mut limit = match limit {
        Some(limit) if limit < 0 => {
            single_batch = true;
            Some(limit.saturating_neg())
        }
        Some(0) | None => None,
        Some(limit) => Some(limit),
    };

    let batch_size = match batch_size {
        Some(batch_size) if batch_size < 0 => {
            let requested = i64::from(batch_size).abs();
            if limit.is_some_and(|limit| requested < limit) {
                limit = Some(requested);
            }
            single_batch = true;
            None
        }
        batch_size => batch_size,
    };

    (limit, batch_size, single_batch)
}

impl OperationWithDefaults for Find {
    const NAME: &'static str = "find";
    const KIND: OperationKind = OperationKind::Find;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.collection_for(Self::NAME)?,
        };

        if let Some(ref filter) = self.filter {
            body.insert("filter", filter.clone());
        }

        if let Some(ref options) = self.options {
            if let Some(ref sort) = options.sort {
                body.insert("sort", sort.to_document()?);
            }

            if let Some(ref projection) = options.projection {
                body.insert("projection", projection.to_document());
            }

            let (limit, batch_size, single_batch) =
                limit_and_batch_size(options.limit, options.batch_size);
            if let Some(limit) = limit {
                body.insert("limit", limit);
            }
            if let Some(batch_size) = batch_size {
                body.insert("batchSize", batch_size);
            }
            if single_batch {
                body.insert("singleBatch", true);
            } else if let Some(single_batch) = options.single_batch {
                body.insert("singleBatch", single_batch);
            }

            match options.cursor_type {
                Some(CursorType::Tailable) => {
                    body.insert("tailable", true);
                }
                Some(CursorType::TailableAwait) => {
                    body.insert("tailable", true);
                    body.insert("awaitData", true);
                }
                _ => {}
            };
        }

        append_options(&mut body, self.options.as_deref())?;

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        description: &ServerDescription,
    ) -> Result<OperationOutput> {
        let options = self.options.as_deref();

        // The comment is only propagated to getMore on 4.4+.
        let comment = if description.max_wire_version.unwrap_or(0) < SERVER_4_4_0_WIRE_VERSION {
            None
        } else {
            options.and_then(|opts| opts.comment.clone())
        };

        let spec = CursorSpecification::from_reply(
            response,
            description.address.clone(),
            options
                .and_then(|opts| opts.batch_size)
                .map(i32::unsigned_abs),
            options.and_then(|opts| opts.max_await_time),
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
        self.options_mut().read_concern = Some(read_concern);
    }

    fn collation(&self) -> Option<&Collation> {
        self.options.as_ref().and_then(|opts| opts.collation.as_ref())
    }
}
