use std::convert::TryFrom;

use crate::{
    bson::{oid::ObjectId, Bson, Document},
    error::{Error, Result},
};

/// Coerce numeric types into an `i64` if it would be lossless to do so. If this Bson is not numeric
/// or the conversion would be lossy (e.g. 1.5 -> 1), this returns `None`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn get_int(val: &Bson) -> Option<i64> {
    match *val {
        Bson::Int32(i) => Some(i64::from(i)),
        Bson::Int64(i) => Some(i),
        Bson::Double(f) if (f - (f as i64 as f64)).abs() <= f64::EPSILON => Some(f as i64),
        _ => None,
    }
}

/// Coerce numeric types into an `u64` if it would be lossless to do so. If this Bson is not numeric
/// or the conversion would be lossy (e.g. 1.5 -> 1), this returns `None`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn get_u64(val: &Bson) -> Option<u64> {
    match *val {
        Bson::Int32(i) => u64::try_from(i).ok(),
        Bson::Int64(i) => u64::try_from(i).ok(),
        Bson::Double(f) if (f - (f as u64 as f64)).abs() <= f64::EPSILON => Some(f as u64),
        _ => None,
    }
}

pub(crate) fn to_bson_array(docs: &[Document]) -> Bson {
    Bson::Array(docs.iter().map(|doc| Bson::Document(doc.clone())).collect())
}

#[cfg(test)]
pub(crate) fn sort_document(document: &mut Document) {
    let temp = std::mem::take(document);

    let mut elements: Vec<_> = temp.into_iter().collect();
    elements.sort_by(|e1, e2| e1.0.cmp(&e2.0));

    document.extend(elements);
}

pub(crate) fn first_key(document: &Document) -> Option<&str> {
    document.keys().next().map(String::as_str)
}

fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}

/// An update document must be non-empty and made up solely of atomic operators.
pub(crate) fn update_document_check(update: &Document) -> Result<()> {
    if !update.is_empty() && update.keys().all(|key| is_operator(key)) {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            "Update document requires atomic operators",
        ))
    }
}

/// An update pipeline must be non-empty and every stage must be named by an operator.
pub(crate) fn update_pipeline_check(pipeline: &[Document]) -> Result<()> {
    if !pipeline.is_empty()
        && pipeline
            .iter()
            .all(|stage| first_key(stage).is_some_and(is_operator))
    {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            "Update pipeline requires atomic operators",
        ))
    }
}

pub(crate) fn replacement_document_check(replacement: &Document) -> Result<()> {
    if replacement.keys().any(|key| is_operator(key)) {
        Err(Error::invalid_argument(
            "Replacement document must not contain atomic operators",
        ))
    } else {
        Ok(())
    }
}

/// Returns the `_id` of the document, prepending a freshly generated `ObjectId` first if the
/// document has none.
pub(crate) fn get_or_prepend_id_field(doc: &mut Document) -> Bson {
    match doc.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            let mut with_id = Document::new();
            with_id.insert("_id", id.clone());
            with_id.extend(std::mem::take(doc));
            *doc = with_id;
            id
        }
    }
}
