use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::{
    bson::{doc, Bson},
    concern::{Acknowledgment, ReadConcern, ReadConcernLevel, WriteConcern},
};

#[test]
fn write_concern_is_acknowledged() {
    let w_1 = WriteConcern::builder()
        .w(Acknowledgment::Nodes(1))
        .journal(false)
        .build();
    assert!(w_1.is_acknowledged());

    let w_majority = WriteConcern::builder()
        .w(Acknowledgment::Majority)
        .journal(false)
        .build();
    assert!(w_majority.is_acknowledged());

    let w_0 = WriteConcern::builder()
        .w(Acknowledgment::Nodes(0))
        .journal(false)
        .build();
    assert!(!w_0.is_acknowledged());

    let w_0 = WriteConcern::builder().w(Acknowledgment::Nodes(0)).build();
    assert!(!w_0.is_acknowledged());

    let empty = WriteConcern::builder().build();
    assert!(empty.is_acknowledged());

    let empty = WriteConcern::builder().journal(true).build();
    assert!(empty.is_acknowledged());
}

#[test]
fn write_concern_deserialize() {
    let w_1 = doc! { "w": 1 };
    let wc: WriteConcern = crate::bson::from_bson(Bson::Document(w_1)).unwrap();
    assert_eq!(
        wc,
        WriteConcern {
            w: Acknowledgment::Nodes(1).into(),
            w_timeout: None,
            journal: None
        }
    );

    let w_timeout = doc! { "w": "majority", "wtimeout": 100 };
    let wc: WriteConcern = crate::bson::from_bson(Bson::Document(w_timeout)).unwrap();
    assert_eq!(
        wc,
        WriteConcern {
            w: Acknowledgment::Majority.into(),
            w_timeout: Duration::from_millis(100).into(),
            journal: None
        }
    );

    let journal = doc! { "w": "tagged", "j": true };
    let wc: WriteConcern = crate::bson::from_bson(Bson::Document(journal)).unwrap();
    assert_eq!(
        wc,
        WriteConcern {
            w: Acknowledgment::Custom("tagged".to_string()).into(),
            w_timeout: None,
            journal: true.into()
        }
    );
}

#[test]
fn write_concern_serializes_set_fields_only() {
    let wc = WriteConcern::builder()
        .w(Acknowledgment::Majority)
        .w_timeout(Duration::from_millis(250))
        .build();
    assert_eq!(
        wc.to_document().unwrap(),
        doc! { "w": "majority", "wtimeout": 250 }
    );
    assert_eq!(
        WriteConcern::unacknowledged().to_document().unwrap(),
        doc! { "w": Bson::from(&Acknowledgment::Nodes(0)) }
    );
}

#[test]
fn write_concern_validate() {
    assert!(WriteConcern::majority().validate().is_ok());

    let negative = WriteConcern::builder().w(Acknowledgment::Nodes(-1)).build();
    assert!(negative.validate().unwrap_err().is_invalid_argument());

    let inconsistent = WriteConcern::builder()
        .w(Acknowledgment::Nodes(0))
        .journal(true)
        .build();
    assert!(inconsistent.validate().unwrap_err().is_invalid_argument());
}

#[test]
fn read_concern_levels() {
    assert_eq!(
        ReadConcern::majority().to_document().unwrap(),
        doc! { "level": "majority" }
    );
    assert_eq!(
        ReadConcern::custom("future").level,
        ReadConcernLevel::Custom("future".to_string())
    );
    let rc: ReadConcern = crate::bson::from_document(doc! { "level": "snapshot" }).unwrap();
    assert_eq!(rc, ReadConcern::snapshot());
}
