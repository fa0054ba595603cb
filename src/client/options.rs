use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};

use derive_where::derive_where;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    concern::{ReadConcern, WriteConcern},
    error::{Error, Result},
    retry::RetryPolicy,
};

pub(crate) const DEFAULT_PORT: u16 = 27017;

/// An enum representing the address of a MongoDB server.
#[derive(Clone, Debug, Eq)]
#[non_exhaustive]
pub enum ServerAddress {
    /// A TCP/IP host and port combination.
    Tcp {
        /// The hostname or IP address where the MongoDB server can be found.
        host: String,

        /// The TCP port that the MongoDB server is listening on.
        ///
        /// The default is 27017.
        port: Option<u16>,
    },
}

impl ServerAddress {
    /// Parses an address string into a `ServerAddress`.
    pub fn parse(address: impl AsRef<str>) -> Result<Self> {
        let address = address.as_ref();
        let mut parts = address.split(':');
        let host = match parts.next() {
            Some(part) if !part.is_empty() => part,
            _ => {
                return Err(Error::invalid_argument(format!(
                    "invalid server address: \"{address}\"; hostname cannot be empty"
                )))
            }
        };

        let port = match parts.next() {
            Some(part) => {
                let port = u16::from_str(part).map_err(|_| {
                    Error::invalid_argument(format!(
                        "port must be valid 16-bit unsigned integer, instead got: {part}"
                    ))
                })?;

                if port == 0 {
                    return Err(Error::invalid_argument(format!(
                        "invalid server address: \"{address}\"; port must be non-zero"
                    )));
                }
                if parts.next().is_some() {
                    return Err(Error::invalid_argument(format!(
                        "address \"{address}\" contains more than one unescaped ':'"
                    )));
                }

                Some(port)
            }
            None => None,
        };

        Ok(ServerAddress::Tcp {
            host: host.to_lowercase(),
            port,
        })
    }

    /// The hostname of this address.
    pub fn host(&self) -> &str {
        match self {
            Self::Tcp { host, .. } => host.as_str(),
        }
    }

    /// The port of this address, if one was specified.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Tcp { port, .. } => *port,
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::Tcp {
            host: "localhost".into(),
            port: None,
        }
    }
}

impl PartialEq for ServerAddress {
    fn eq(&self, other: &Self) -> bool {
        self.host() == other.host()
            && self.port().unwrap_or(DEFAULT_PORT) == other.port().unwrap_or(DEFAULT_PORT)
    }
}

impl Hash for ServerAddress {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.host().hash(state);
        self.port().unwrap_or(DEFAULT_PORT).hash(state);
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}:{}",
            self.host(),
            self.port().unwrap_or(DEFAULT_PORT)
        )
    }
}

impl<'de> Deserialize<'de> for ServerAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::parse(s.as_str()).map_err(|e| D::Error::custom(format!("{e}")))
    }
}

impl Serialize for ServerAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Contains the options that can be used to create a new [`Client`](../struct.Client.html).
#[derive(Clone, Default, Deserialize, TypedBuilder)]
#[derive_where(Debug)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ClientOptions {
    /// The application name that the client will send to the server as part of the handshake.
    /// This can be used in combination with the server logs to determine which client is
    /// connected to a server.
    pub app_name: Option<String>,

    /// Whether or not the client should retry a read operation if the operation fails.
    ///
    /// The default value is true.
    pub retry_reads: Option<bool>,

    /// Whether or not the client should retry a write operation if the operation fails.
    ///
    /// The default value is true.
    pub retry_writes: Option<bool>,

    /// The default read concern for operations performed on the client. Only used by operations
    /// that do not specify their own.
    pub read_concern: Option<ReadConcern>,

    /// The default write concern for operations performed on the client. Only used by operations
    /// that do not specify their own.
    pub write_concern: Option<WriteConcern>,

    /// The policy used to classify errors as retryable. Defaults to
    /// [`DefaultRetryPolicy`](crate::retry::DefaultRetryPolicy).
    #[serde(skip)]
    #[derive_where(skip)]
    #[builder(setter(!into, strip_option))]
    pub retry_policy: Option<Arc<dyn RetryPolicy>>,
}

/// Contains the options that can be used to create a new
/// [`ClientSession`](../struct.ClientSession.html).
#[derive(Clone, Debug, Default, Deserialize, TypedBuilder, PartialEq)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct SessionOptions {
    /// If true, all operations performed in the context of this session
    /// will be [causally consistent](https://www.mongodb.com/docs/manual/core/causal-consistency-read-write-concerns/).
    ///
    /// Defaults to true if [`SessionOptions::snapshot`] is unspecified.
    pub causal_consistency: Option<bool>,

    /// If true, all read operations performed using this client session will share the same
    /// snapshot. Requires a deployment able to serve snapshot reads.
    pub snapshot: Option<bool>,
}

impl SessionOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if let (Some(causal_consistency), Some(snapshot)) = (self.causal_consistency, self.snapshot)
        {
            if causal_consistency && snapshot {
                return Err(Error::invalid_argument(
                    "snapshot and causal consistency are mutually exclusive",
                ));
            }
        }
        Ok(())
    }
}

/// Contains the options that can be used for a transaction.
#[derive(Clone, Debug, Default, Deserialize, TypedBuilder, PartialEq)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct TransactionOptions {
    /// The read concern sent with the first command of the transaction.
    pub read_concern: Option<ReadConcern>,

    /// The write concern used when committing or aborting the transaction. Must be acknowledged.
    pub write_concern: Option<WriteConcern>,
}
