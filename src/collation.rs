use serde::{Deserialize, Deserializer, Serialize, Serializer};
use typed_builder::TypedBuilder;

use crate::{bson::Document, error::Result, serde_util};

/// A collation configuration. See the official MongoDB
/// [documentation](https://www.mongodb.com/docs/manual/reference/collation/) for more information
/// on each of the fields.
///
/// Collations are rendered on every command that accepts them, except statement-level write
/// commands (`update` and `delete`) where they are attached to each statement instead.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct Collation {
    /// The ICU locale.
    #[builder(!default)]
    pub locale: String,

    /// The level of comparison to perform.
    pub strength: Option<CollationStrength>,

    /// Whether to include a separate level for case differences.
    pub case_level: Option<bool>,

    /// The sort order of case differences during tertiary level comparisons.
    pub case_first: Option<CollationCaseFirst>,

    /// Whether to compare numeric strings as numbers or strings.
    pub numeric_ordering: Option<bool>,

    /// Whether collation should consider whitespace and punctuation as base characters.
    pub alternate: Option<CollationAlternate>,

    /// Which characters are affected by `alternate: "shifted"`.
    pub max_variable: Option<CollationMaxVariable>,

    /// Whether to check if text requires normalization and to perform it.
    pub normalization: Option<bool>,

    /// Whether strings with diacritics sort from the back of the string.
    pub backwards: Option<bool>,
}

impl Collation {
    pub(crate) fn to_document(&self) -> Result<Document> {
        serde_util::to_document(self)
    }
}

/// The level of comparison to perform. Corresponds to [ICU Comparison Levels](http://userguide.icu-project.org/collation/concepts#TOC-Comparison-Levels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollationStrength {
    /// Base characters only.
    Primary,
    /// Base characters and diacritics.
    Secondary,
    /// Base characters, diacritics and case.
    Tertiary,
    /// Tertiary plus punctuation.
    Quaternary,
    /// Code point comparison as a tie breaker.
    Identical,
}

impl CollationStrength {
    fn level(self) -> i32 {
        match self {
            CollationStrength::Primary => 1,
            CollationStrength::Secondary => 2,
            CollationStrength::Tertiary => 3,
            CollationStrength::Quaternary => 4,
            CollationStrength::Identical => 5,
        }
    }
}

impl Serialize for CollationStrength {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.level())
    }
}

impl<'de> Deserialize<'de> for CollationStrength {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match i32::deserialize(deserializer)? {
            1 => Ok(CollationStrength::Primary),
            2 => Ok(CollationStrength::Secondary),
            3 => Ok(CollationStrength::Tertiary),
            4 => Ok(CollationStrength::Quaternary),
            5 => Ok(CollationStrength::Identical),
            other => Err(serde::de::Error::custom(format!(
                "invalid collation strength: {other}"
            ))),
        }
    }
}

/// Setting that determines sort order of case differences during case tertiary level comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum CollationCaseFirst {
    /// Uppercase sorts before lowercase.
    Upper,
    /// Lowercase sorts before uppercase.
    Lower,
    /// Default value, similar to `Lower` with slight differences.
    Off,
}

/// Setting that determines whether collation should consider whitespace and punctuation as base
/// characters for purposes of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum CollationAlternate {
    /// Whitespace and punctuation are considered base characters.
    NonIgnorable,
    /// Whitespace and punctuation are not considered base characters.
    Shifted,
}

/// Field that determines which characters are considered ignorable when `alternate` is shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum CollationMaxVariable {
    /// Both whitespace and punctuation are "ignorable".
    Punct,
    /// Only whitespace is "ignorable".
    Space,
}
