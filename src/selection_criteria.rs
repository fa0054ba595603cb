use std::{collections::HashMap, time::Duration};

use serde::{de::Error as SerdeError, Deserialize, Deserializer, Serialize};
use typed_builder::TypedBuilder;

use crate::client::options::ServerAddress;

/// The wire version of MongoDB 5.0, the first release able to run aggregations with a write
/// stage on secondaries.
const SECONDARY_WRITABLE_MIN_WIRE_VERSION: i32 = 13;

static PRIMARY: ReadPreference = ReadPreference::Primary;

/// Specifies how the driver should route a read operation to members of a replica set.
///
/// If applicable, `tag_sets` can be used to target specific nodes in a replica set, and
/// `max_staleness` specifies the maximum lag behind the primary that a secondary can be to remain
/// eligible for the operation.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ReadPreference {
    /// Only route this operation to the primary.
    Primary,

    /// Only route this operation to a secondary.
    Secondary {
        options: Option<ReadPreferenceOptions>,
    },

    /// Route this operation to the primary if it's available, but fall back to the secondaries if
    /// not.
    PrimaryPreferred {
        options: Option<ReadPreferenceOptions>,
    },

    /// Route this operation to a secondary if one is available, but fall back to the primary if
    /// not.
    SecondaryPreferred {
        options: Option<ReadPreferenceOptions>,
    },

    /// Route this operation to the node with the least network latency regardless of whether it's
    /// the primary or a secondary.
    Nearest {
        options: Option<ReadPreferenceOptions>,
    },
}

impl std::fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ Mode: {}", self.mode())?;

        if let Some(options) = self.options() {
            if let Some(ref tag_sets) = options.tag_sets {
                write!(f, ", Tag Sets: {tag_sets:?}")?;
            }
            if let Some(ref max_staleness) = options.max_staleness {
                write!(f, ", Max Staleness: {max_staleness:?}")?;
            }
        }

        write!(f, " }}")
    }
}

impl<'de> Deserialize<'de> for ReadPreference {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ReadPreferenceHelper {
            mode: String,
            #[serde(flatten)]
            options: ReadPreferenceOptions,
        }
        let helper = ReadPreferenceHelper::deserialize(deserializer)?;
        match helper.mode.to_ascii_lowercase().as_str() {
            "primary" => {
                if helper.options != ReadPreferenceOptions::default() {
                    return Err(D::Error::custom(format!(
                        "cannot specify options for primary read preference, got {:?}",
                        helper.options
                    )));
                }
                Ok(ReadPreference::Primary)
            }
            "secondary" => Ok(ReadPreference::Secondary {
                options: Some(helper.options),
            }),
            "primarypreferred" => Ok(ReadPreference::PrimaryPreferred {
                options: Some(helper.options),
            }),
            "secondarypreferred" => Ok(ReadPreference::SecondaryPreferred {
                options: Some(helper.options),
            }),
            "nearest" => Ok(ReadPreference::Nearest {
                options: Some(helper.options),
            }),
            other => Err(D::Error::custom(format!(
                "Unknown read preference mode: {other}"
            ))),
        }
    }
}

impl Serialize for ReadPreference {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[serde_with::skip_serializing_none]
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ReadPreferenceHelper<'a> {
            mode: &'static str,
            #[serde(flatten)]
            options: Option<&'a ReadPreferenceOptions>,
        }

        ReadPreferenceHelper {
            mode: self.mode(),
            options: self.options(),
        }
        .serialize(serializer)
    }
}

/// Specifies read preference options for non-primary read preferences.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ReadPreferenceOptions {
    /// Specifies which replica set members should be considered for operations. Each tag set will
    /// be checked in order until one or more servers is found with each tag in the set.
    #[serde(alias = "tag_sets")]
    pub tag_sets: Option<Vec<TagSet>>,

    /// Specifies the maximum amount of lag behind the primary that a secondary can be to be
    /// considered for the given operation.
    #[serde(
        rename = "maxStalenessSeconds",
        default,
        serialize_with = "serialize_duration_option_as_int_secs",
        deserialize_with = "deserialize_duration_option_from_int_secs"
    )]
    pub max_staleness: Option<Duration>,
}

/// A read preference tag set. See the documentation
/// [here](https://www.mongodb.com/docs/manual/tutorial/configure-replica-set-tag-sets/) for more
/// details.
pub type TagSet = HashMap<String, String>;

fn serialize_duration_option_as_int_secs<S: serde::Serializer>(
    val: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match val {
        Some(duration) => {
            serializer.serialize_i64(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
        }
        None => serializer.serialize_none(),
    }
}

fn deserialize_duration_option_from_int_secs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error> {
    Ok(Option::<crate::bson::Bson>::deserialize(deserializer)?
        .as_ref()
        .and_then(crate::bson_util::get_u64)
        .map(Duration::from_secs))
}

impl ReadPreference {
    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::PrimaryPreferred { .. } => "primaryPreferred",
            Self::Secondary { .. } => "secondary",
            Self::SecondaryPreferred { .. } => "secondaryPreferred",
            Self::Nearest { .. } => "nearest",
        }
    }

    pub(crate) fn options(&self) -> Option<&ReadPreferenceOptions> {
        match self {
            ReadPreference::Primary => None,
            ReadPreference::Secondary { options }
            | ReadPreference::PrimaryPreferred { options }
            | ReadPreference::SecondaryPreferred { options }
            | ReadPreference::Nearest { options } => options.as_ref(),
        }
    }

    pub(crate) fn is_primary(&self) -> bool {
        matches!(self, ReadPreference::Primary)
    }
}

/// How the topology should pick a server for an operation.
#[derive(Clone, Debug, PartialEq, derive_more::Display)]
#[non_exhaustive]
pub enum ServerSelector {
    /// Select a server eligible under the read preference.
    #[display("ReadPreference {_0}")]
    ReadPreference(ReadPreference),

    /// Select exactly the server with the given address. Used by operations that continue work
    /// started on a specific server, and by sessions pinned to a mongos.
    #[display("SameServer {_0}")]
    SameServer(ServerAddress),

    /// Select a server able to run a write-stage aggregation under the read preference. When the
    /// deployment is too old to run such aggregations on secondaries, only the primary qualifies.
    #[display("SecondaryWritable {read_preference} (wire version {common_wire_version:?})")]
    SecondaryWritable {
        /// The read preference requested by the operation.
        read_preference: ReadPreference,
        /// The lowest max wire version among the known servers of the topology.
        common_wire_version: Option<i32>,
    },
}

impl ServerSelector {
    /// The read preference the topology should apply when choosing among servers, or `None` for
    /// address-based selection.
    pub fn effective_read_preference(&self) -> Option<&ReadPreference> {
        match self {
            Self::ReadPreference(read_preference) => Some(read_preference),
            Self::SameServer(_) => None,
            Self::SecondaryWritable {
                read_preference,
                common_wire_version,
            } => match common_wire_version {
                Some(version) if *version >= SECONDARY_WRITABLE_MIN_WIRE_VERSION => {
                    Some(read_preference)
                }
                _ => Some(&PRIMARY),
            },
        }
    }

    pub(crate) fn address(&self) -> Option<&ServerAddress> {
        match self {
            Self::SameServer(address) => Some(address),
            _ => None,
        }
    }
}

impl From<ReadPreference> for ServerSelector {
    fn from(read_pref: ReadPreference) -> Self {
        Self::ReadPreference(read_pref)
    }
}
