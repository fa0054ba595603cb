use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// A struct modeling the target of an operation: a database, and optionally a collection within
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// The name of the database associated with this namespace.
    pub db: String,

    /// The name of the collection this namespace corresponds to, if the operation targets one.
    pub coll: Option<String>,
}

impl Namespace {
    /// Construct a `Namespace` with the given database and collection.
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: Some(coll.into()),
        }
    }

    /// Construct a `Namespace` targeting a database as a whole.
    pub fn database(db: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: None,
        }
    }

    /// The `admin` database.
    pub fn admin() -> Self {
        Self::database("admin")
    }

    /// The collection name, or an error naming the command that required one.
    pub(crate) fn collection_for(&self, command_name: &str) -> Result<&str> {
        self.coll.as_deref().ok_or_else(|| {
            Error::invalid_argument(format!("{command_name} requires a collection name"))
        })
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.coll {
            Some(ref coll) => write!(fmt, "{}.{}", self.db, coll),
            None => write!(fmt, "{}", self.db),
        }
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::from_str(&s).map_err(|e| D::Error::custom(e.to_string()))
    }
}

impl Serialize for Namespace {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl FromStr for Namespace {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');

        let db = parts.next().unwrap_or_default();
        let coll = parts.collect::<Vec<_>>().join(".");

        match (db, coll) {
            ("", _) => Err(Self::Err::invalid_argument(
                "Missing database name in namespace",
            )),
            (db, coll) if coll.is_empty() => Ok(Self::database(db)),
            (db, coll) => Ok(Self::new(db, coll)),
        }
    }
}
