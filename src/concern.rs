//! Read and write concerns, the consistency and durability settings attached to commands.

#[cfg(test)]
mod test;

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::{Bson, Document},
    error::{Error, Result},
    serde_util,
};

/// The isolation level requested for reads, sent as the `readConcern` field of a command.
///
/// See <https://www.mongodb.com/docs/manual/reference/read-concern/>.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[non_exhaustive]
pub struct ReadConcern {
    /// The requested level.
    pub level: ReadConcernLevel,
}

impl ReadConcern {
    /// A `"majority"` read concern.
    pub fn majority() -> Self {
        ReadConcernLevel::Majority.into()
    }

    /// A `"local"` read concern.
    pub fn local() -> Self {
        ReadConcernLevel::Local.into()
    }

    /// A `"linearizable"` read concern.
    pub fn linearizable() -> Self {
        ReadConcernLevel::Linearizable.into()
    }

    /// An `"available"` read concern.
    pub fn available() -> Self {
        ReadConcernLevel::Available.into()
    }

    /// A `"snapshot"` read concern.
    pub fn snapshot() -> Self {
        ReadConcernLevel::Snapshot.into()
    }

    /// A read concern with a level this crate does not know about.
    pub fn custom(level: impl AsRef<str>) -> Self {
        ReadConcernLevel::parse(level.as_ref()).into()
    }

    pub(crate) fn to_document(&self) -> Result<Document> {
        serde_util::to_document(self)
    }
}

impl From<ReadConcernLevel> for ReadConcern {
    fn from(level: ReadConcernLevel) -> Self {
        Self { level }
    }
}

/// The level of a [`ReadConcern`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ReadConcernLevel {
    /// The most recent data on the queried node.
    Local,

    /// Data acknowledged by a majority of the replica set.
    Majority,

    /// Data reflecting every majority-acknowledged write that completed before the read began.
    Linearizable,

    /// The most recent data on the queried node, possibly including orphaned documents.
    Available,

    /// A snapshot of majority-committed data.
    Snapshot,

    /// Any other level, passed through verbatim.
    Custom(String),
}

const KNOWN_LEVELS: [(&str, ReadConcernLevel); 5] = [
    ("local", ReadConcernLevel::Local),
    ("majority", ReadConcernLevel::Majority),
    ("linearizable", ReadConcernLevel::Linearizable),
    ("available", ReadConcernLevel::Available),
    ("snapshot", ReadConcernLevel::Snapshot),
];

impl ReadConcernLevel {
    fn parse(level: &str) -> Self {
        KNOWN_LEVELS
            .iter()
            .find(|(name, _)| *name == level)
            .map_or_else(|| Self::Custom(level.to_string()), |(_, known)| known.clone())
    }

    pub(crate) fn as_str(&self) -> &str {
        if let Self::Custom(level) = self {
            return level;
        }
        KNOWN_LEVELS
            .iter()
            .find(|(_, known)| known == self)
            .map_or("", |(name, _)| *name)
    }
}

impl<'de> Deserialize<'de> for ReadConcernLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(|level| Self::parse(&level))
    }
}

impl Serialize for ReadConcernLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The acknowledgement requested for writes, sent as the `writeConcern` field of a command.
///
/// See <https://www.mongodb.com/docs/manual/reference/write-concern/>.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct WriteConcern {
    /// How many nodes, or which tagged set of nodes, must acknowledge the write.
    pub w: Option<Acknowledgment>,

    /// How long the server waits for the requested acknowledgement before reporting a write
    /// concern error. Writes that already happened are not rolled back when this expires.
    #[serde(rename = "wtimeout", alias = "wtimeoutMS")]
    #[serde(serialize_with = "serde_util::serialize_duration_option_as_int_millis")]
    #[serde(deserialize_with = "serde_util::deserialize_duration_option_from_u64_millis")]
    #[serde(default)]
    pub w_timeout: Option<Duration>,

    /// Whether the write must reach the on-disk journal before it is acknowledged.
    #[serde(rename = "j", alias = "journal")]
    pub journal: Option<bool>,
}

/// The `w` field of a [`WriteConcern`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Acknowledgment {
    /// The number of nodes that must acknowledge the write. Zero makes the write unacknowledged:
    /// such writes are never retried and cannot run in an explicit session.
    Nodes(i32),

    /// A majority of the data-bearing nodes.
    Majority,

    /// A write concern defined by name in the replica set configuration.
    Custom(String),
}

impl From<&Acknowledgment> for Bson {
    fn from(acknowledgment: &Acknowledgment) -> Self {
        match acknowledgment {
            Acknowledgment::Nodes(nodes) => Bson::Int32(*nodes),
            Acknowledgment::Majority => Bson::String("majority".to_string()),
            Acknowledgment::Custom(name) => Bson::String(name.clone()),
        }
    }
}

impl Serialize for Acknowledgment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Acknowledgment::Nodes(nodes) => serializer.serialize_i32(*nodes),
            Acknowledgment::Majority => serializer.serialize_str("majority"),
            Acknowledgment::Custom(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Acknowledgment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Bson::deserialize(deserializer)? {
            Bson::String(name) => Ok(name.into()),
            Bson::Int32(nodes) => Ok(nodes.into()),
            Bson::Int64(nodes) => i32::try_from(nodes)
                .map(Acknowledgment::Nodes)
                .map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "expected a number or a string for w, got {other:?}"
            ))),
        }
    }
}

impl From<i32> for Acknowledgment {
    fn from(nodes: i32) -> Self {
        Acknowledgment::Nodes(nodes)
    }
}

impl From<&str> for Acknowledgment {
    fn from(name: &str) -> Self {
        match name {
            "majority" => Acknowledgment::Majority,
            custom => Acknowledgment::Custom(custom.to_string()),
        }
    }
}

impl From<String> for Acknowledgment {
    fn from(name: String) -> Self {
        name.as_str().into()
    }
}

impl WriteConcern {
    /// `{ w: 0 }`.
    pub fn unacknowledged() -> Self {
        Self::builder().w(Acknowledgment::Nodes(0)).build()
    }

    /// `{ w: "majority" }`.
    pub fn majority() -> Self {
        Self::builder().w(Acknowledgment::Majority).build()
    }

    /// Whether the server reports the outcome of writes sent with this write concern. A `j: true`
    /// acknowledges the write even when `w` is zero.
    pub fn is_acknowledged(&self) -> bool {
        self.journal == Some(true) || !matches!(self.w, Some(Acknowledgment::Nodes(0)))
    }

    /// Whether no field is set, meaning the server's default applies.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Rejects a negative `w` and the contradictory `{ w: 0, j: true }`.
    pub fn validate(&self) -> Result<()> {
        match (&self.w, self.journal) {
            (Some(Acknowledgment::Nodes(nodes)), _) if *nodes < 0 => Err(Error::invalid_argument(
                "write concern `w` field cannot be negative integer",
            )),
            (Some(Acknowledgment::Nodes(0)), Some(true)) => Err(Error::invalid_argument(
                "write concern cannot have w=0 and j=true",
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn to_document(&self) -> Result<Document> {
        serde_util::to_document(self)
    }
}
