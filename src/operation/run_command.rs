use crate::{
    bson::Document,
    bson_util,
    concern::WriteConcern,
    error::{Error, Result},
    operation::{BuildContext, Command, OperationKind, OperationOutput, OperationWithDefaults},
    options::ReadPreference,
    sdam::ServerDescription,
};

#[derive(Debug, Clone)]
pub(crate) struct RunCommand {
    db: String,
    command: Document,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
}

impl RunCommand {
    pub(crate) fn new(
        db: String,
        command: Document,
        read_preference: Option<ReadPreference>,
    ) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::invalid_argument(
                "an empty document cannot be passed to a run_command operation",
            ));
        }

        Ok(Self {
            db,
            command,
            read_preference,
            write_concern: None,
        })
    }

    /// Attaches a write concern to the command, as the transaction-ending commands need.
    pub(crate) fn with_write_concern(mut self, write_concern: Option<WriteConcern>) -> Self {
        self.write_concern = write_concern;
        self
    }

    fn command_name(&self) -> &str {
        bson_util::first_key(&self.command).unwrap_or(Self::NAME)
    }
}

impl OperationWithDefaults for RunCommand {
    // The real name is the first key of the command document; this placeholder should fail
    // loudly if it ever reaches a server.
    const NAME: &'static str = "$genericRunCommand";
    const KIND: OperationKind = OperationKind::RunCommand;

    fn build(&self, _context: &BuildContext) -> Result<Command> {
        Ok(Command::new(
            self.command_name(),
            &self.db,
            self.command.clone(),
        ))
    }

    fn handle_response(
        &self,
        response: Document,
        _description: &ServerDescription,
    ) -> Result<OperationOutput> {
        Ok(OperationOutput::Command(response))
    }

    fn read_preference(&self) -> Option<&ReadPreference> {
        self.read_preference.as_ref()
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.write_concern.as_ref()
    }

    fn attaches_write_concern(&self) -> bool {
        self.write_concern.is_some()
    }

    fn name(&self) -> &str {
        self.command_name()
    }
}
