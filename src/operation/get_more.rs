
use std::{collections::VecDeque, time::Duration};

use serde::Deserialize;

use crate::{
    bson::{doc, Bson, Document},
    cursor::CursorInformation,
    error::{Error, Result},
    operation::{
        command::duration_as_millis,
        parse_body,
        BuildContext,
        Command,
        OperationKind,
        OperationOutput,
        OperationWithDefaults,
        SERVER_4_4_0_WIRE_VERSION,
    },
    options::ServerAddress,
    results::GetMoreResult,
    sdam::ServerDescription,
    Namespace,
};

#[derive(Debug, Clone)]
pub(crate) struct GetMore {
    ns: Namespace,
    cursor_id: i64,
    address: ServerAddress,
    batch_size: Option<u32>,
    max_time: Option<Duration>,
    comment: Option<Bson>,
}

impl GetMore {
    pub(crate) fn new(info: CursorInformation) -> Result<Self> {
        if info.id == 0 {
            return Err(Error::invalid_argument(
                "getMore requires a live cursor, but the cursor id is 0",
            ));
        }

        Ok(Self {
            ns: info.ns,
            cursor_id: info.id,
            address: info.address,
            batch_size: info.batch_size,
            max_time: info.max_time,
            comment: info.comment,
        })
    }
}

impl OperationWithDefaults for GetMore {
    const NAME: &'static str = "getMore";
    const KIND: OperationKind = OperationKind::GetMore;

    fn build(&self, context: &BuildContext) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.cursor_id,
            "collection": self.ns.collection_for(Self::NAME)?,
        };

        if let Some(batch_size) = self.batch_size {
            let batch_size = i32::try_from(batch_size).map_err(|_| {
                Error::invalid_argument("The batch size must fit into a signed 32-bit integer")
            })?;
            if batch_size != 0 {
                body.insert("batchSize", batch_size);
            }
        }

        if let Some(max_time) = self.max_time {
            body.insert("maxTimeMS", duration_as_millis(max_time));
        }

        if context.max_wire_version >= SERVER_4_4_0_WIRE_VERSION {
            if let Some(ref comment) = self.comment {
                body.insert("comment", comment.clone());
            }
        }

        Ok(Command::new(Self::NAME, &self.ns.db, body))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        let response: GetMoreResponseBody = parse_body(response)?;

        Ok(OperationOutput::GetMore(GetMoreResult {
            batch: response.cursor.next_batch,
            exhausted: response.cursor.id == 0,
            id: response.cursor.id,
        }))
    }

    fn bound_server(&self) -> Option<&ServerAddress> {
        Some(&self.address)
    }
}

#[derive(Debug, Deserialize)]
struct GetMoreResponseBody {
    cursor: NextBatchBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextBatchBody {
    id: i64,
    next_batch: VecDeque<Document>,
}
