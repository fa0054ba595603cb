mod executor;
pub mod options;
pub mod session;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use uuid::Uuid;

use crate::{
    error::{Error, ErrorKind, Result},
    options::{ClientOptions, SessionOptions},
    retry::{DefaultRetryPolicy, RetryPolicy},
    sdam::{Topology, TopologyConnector},
};
use session::{ClientSession, ServerSessionPool};

/// This is the main entry point for the API. A `Client` runs [`Operation`](crate::operation::Operation)s
/// against the deployment reached through its [`TopologyConnector`].
///
/// `Client` uses [`std::sync::Arc`](https://doc.rust-lang.org/std/sync/struct.Arc.html) internally,
/// so it can safely be shared across threads and tasks. Cloning a `Client` is cheap and every
/// clone shares the same topology and session pool.
///
/// The topology is connected lazily by the first operation, or explicitly with
/// [`Client::connect`]. After [`Client::close`] every operation fails with
/// [`ErrorKind::NotConnected`].
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[allow(dead_code, unreachable_code, clippy::diverging_sub_expression)]
const _: fn() = || {
    fn assert_send<T: Send>(_t: T) {}
    fn assert_sync<T: Sync>(_t: T) {}

    let _c: super::Client = todo!();
    assert_send(_c);
    assert_sync(_c);
};

#[derive(Debug)]
struct ClientInner {
    id: Uuid,
    options: ClientOptions,
    connector: Box<dyn TopologyConnector>,
    topology: tokio::sync::Mutex<TopologyState>,
    session_pool: ServerSessionPool,
    next_operation_id: AtomicU64,
}

#[derive(Debug)]
enum TopologyState {
    Disconnected,
    Connected(Arc<dyn Topology>),
    Closed,
}

impl Client {
    /// Creates a new `Client` that reaches the deployment through the given connector. No
    /// connection is made until the first operation runs or [`Client::connect`] is called.
    pub fn with_connector(connector: impl TopologyConnector + 'static, options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                id: Uuid::new_v4(),
                options,
                connector: Box::new(connector),
                topology: tokio::sync::Mutex::new(TopologyState::Disconnected),
                session_pool: ServerSessionPool::new(),
                next_operation_id: AtomicU64::new(1),
            }),
        }
    }

    /// The options this client was created with.
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Connects to the deployment. Calling this on a connected client does nothing.
    pub async fn connect(&self) -> Result<()> {
        self.topology().await.map(|_| ())
    }

    /// Closes the client. Pooled server sessions are discarded and every later operation fails
    /// with [`ErrorKind::NotConnected`].
    pub async fn close(&self) {
        *self.inner.topology.lock().await = TopologyState::Closed;
        self.inner.session_pool.clear();
    }

    /// Starts a new [`ClientSession`].
    pub async fn start_session(
        &self,
        options: impl Into<Option<SessionOptions>>,
    ) -> Result<ClientSession> {
        let options = options.into();
        if let Some(ref options) = options {
            options.validate()?;
        }

        let capabilities = self.topology().await?.capabilities();
        if !capabilities.supports_sessions {
            return Err(Error::incompatible_server(
                "this deployment does not support sessions",
            ));
        }

        Ok(ClientSession::new(
            self.clone(),
            options,
            None,
            capabilities.logical_session_timeout,
        ))
    }

    /// Returns the topology, connecting first if needed.
    pub(crate) async fn topology(&self) -> Result<Arc<dyn Topology>> {
        let mut state = self.inner.topology.lock().await;
        match *state {
            TopologyState::Connected(ref topology) => Ok(topology.clone()),
            TopologyState::Closed => Err(ErrorKind::NotConnected.into()),
            TopologyState::Disconnected => {
                let topology = self.inner.connector.connect().await?;
                *state = TopologyState::Connected(topology.clone());
                Ok(topology)
            }
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.inner.id
    }

    pub(crate) fn session_pool(&self) -> &ServerSessionPool {
        &self.inner.session_pool
    }

    pub(crate) fn retry_policy(&self) -> &dyn RetryPolicy {
        match self.inner.options.retry_policy {
            Some(ref policy) => policy.as_ref(),
            None => &DefaultRetryPolicy,
        }
    }

    pub(crate) fn next_operation_id(&self) -> u64 {
        self.inner.next_operation_id.fetch_add(1, Ordering::SeqCst)
    }
}
