//! The interfaces through which the executor reaches the deployment: topology access, server
//! selection and command dispatch. Monitoring, connection pooling and the wire protocol live
//! behind these traits.

use std::{fmt::Debug, sync::Arc, time::Duration};

use typed_builder::TypedBuilder;

use crate::{
    bson::Document,
    error::Result,
    operation::Command,
    options::{ReadPreference, ServerAddress, ServerSelector},
    BoxFuture,
};

/// The oldest wire version on which retryable writes are available.
const RETRYABLE_WRITES_MIN_WIRE_VERSION: i32 = 6;

/// The possible types for a server.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[non_exhaustive]
pub enum ServerType {
    /// A single, non-replica set mongod.
    Standalone,

    /// A router used in sharded deployments.
    Mongos,

    /// The primary node in a replica set.
    RsPrimary,

    /// A secondary node in a replica set.
    RsSecondary,

    /// A non-data bearing node in a replica set which can participate in elections.
    RsArbiter,

    /// Hidden, starting up, or recovering nodes in a replica set.
    RsOther,

    /// A member of an uninitialized replica set or a member that has been removed from the replica
    /// set config.
    RsGhost,

    /// A load-balancing proxy between the driver and the MongoDB deployment.
    LoadBalancer,

    /// A server that the driver hasn't yet communicated with or can't connect to.
    #[default]
    Unknown,
}

/// What the executor needs to know about a selected server.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct ServerDescription {
    /// The address of the server.
    #[builder(!default)]
    pub address: ServerAddress,

    /// The type of the server.
    pub server_type: ServerType,

    /// The maximum wire version that the server understands.
    pub max_wire_version: Option<i32>,

    /// How long sessions started on this server will stay alive without executing an operation
    /// before the server kills them.
    pub logical_session_timeout: Option<Duration>,
}

impl ServerDescription {
    /// Whether writes sent to this server may be retried.
    pub fn supports_retryable_writes(&self) -> bool {
        self.server_type != ServerType::Standalone
            && self.logical_session_timeout.is_some()
            && self
                .max_wire_version
                .is_some_and(|version| version >= RETRYABLE_WRITES_MIN_WIRE_VERSION)
    }

    pub(crate) fn is_sharded(&self) -> bool {
        self.server_type == ServerType::Mongos
    }
}

/// Deployment-wide features the executor consults before choosing a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct TopologyCapabilities {
    /// Whether the deployment supports logical sessions.
    pub supports_sessions: bool,

    /// Whether the deployment can serve reads from a snapshot session.
    pub supports_snapshot_reads: bool,

    /// The smallest logical session timeout reported by the data-bearing servers.
    pub logical_session_timeout: Option<Duration>,
}

/// Information passed along with a server selection request.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct SelectionContext {
    /// The name of the command being run.
    pub operation_name: String,

    /// The server that failed the previous attempt of this operation, if any. Topologies should
    /// prefer other suitable servers over it.
    pub deprioritized: Option<ServerAddress>,
}

impl SelectionContext {
    pub(crate) fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            deprioritized: None,
        }
    }

    pub(crate) fn deprioritize(mut self, address: Option<&ServerAddress>) -> Self {
        self.deprioritized = address.cloned();
        self
    }
}

/// Per-dispatch details the server needs alongside the command document.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct CommandOptions {
    /// The read preference that selected the server. The topology decides whether it has to be
    /// forwarded as `$readPreference`.
    pub read_preference: Option<ReadPreference>,
}

/// A view of the deployment able to pick servers for operations.
pub trait Topology: Send + Sync + Debug {
    /// Selects a server matching the given selector.
    fn select_server<'a>(
        &'a self,
        selector: &'a ServerSelector,
        context: SelectionContext,
    ) -> BoxFuture<'a, Result<Arc<dyn Server>>>;

    /// The lowest max wire version among the known data-bearing servers, if any is known.
    fn common_wire_version(&self) -> Option<i32>;

    /// The features supported by the deployment.
    fn capabilities(&self) -> TopologyCapabilities;
}

/// A single server able to run commands.
pub trait Server: Send + Sync + Debug {
    /// The current description of this server.
    fn description(&self) -> ServerDescription;

    /// Sends the command to the server and returns the reply body.
    ///
    /// Transport failures should be reported as [`ErrorKind::Io`](crate::error::ErrorKind::Io)
    /// errors. Replies with `ok: 0` are returned as-is; the executor interprets them.
    fn command<'a>(
        &'a self,
        command: &'a Command,
        options: CommandOptions,
    ) -> BoxFuture<'a, Result<Document>>;
}

/// Establishes the topology a client runs operations against.
pub trait TopologyConnector: Send + Sync + Debug {
    /// Connects to the deployment.
    fn connect(&self) -> BoxFuture<'_, Result<Arc<dyn Topology>>>;
}
