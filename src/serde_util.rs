use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

use crate::{
    bson::{Bson, Document},
    bson_util::get_u64,
    error::{Error, Result},
};

/// Writes a duration as whole milliseconds, using an `Int32` whenever the value fits.
pub(crate) fn serialize_duration_option_as_int_millis<S: Serializer>(
    val: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let Some(millis) = val.map(|duration| duration.as_millis()) else {
        return serializer.serialize_none();
    };
    match i32::try_from(millis) {
        Ok(millis) => serializer.serialize_i32(millis),
        Err(_) => serializer.serialize_i64(i64::try_from(millis).unwrap_or(i64::MAX)),
    }
}

pub(crate) fn deserialize_duration_option_from_u64_millis<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = Option::<u64>::deserialize(deserializer)?;
    Ok(millis.map(Duration::from_millis))
}

pub(crate) fn deserialize_u64_from_bson_number<'de, D>(
    deserializer: D,
) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let bson = Bson::deserialize(deserializer)?;
    get_u64(&bson)
        .ok_or_else(|| serde::de::Error::custom(format!("could not deserialize u64 from {bson:?}")))
}

/// Serializes the given value into a document, failing if it serializes to anything else.
pub(crate) fn to_document<T: serde::Serialize>(value: &T) -> Result<Document> {
    match crate::bson::to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(Error::invalid_argument(format!(
            "expected value to serialize to a document, got {:?}",
            other.element_type()
        ))),
    }
}
