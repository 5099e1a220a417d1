//! Conversion between DAS-side JSON objects and [`Dataset`] records.

use serde_json::{Map, Value};

use crate::domain::{Dataset, format_creation_time, parse_creation_time};
use crate::error::DasError;

/// Record fields that are copied one-to-one from a DAS object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Process,
    UserComment,
    Energy,
    Nevents,
    CmsswRelease,
    Dsize,
    Globaltag,
    Xsection,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Process,
        Field::UserComment,
        Field::Energy,
        Field::Nevents,
        Field::CmsswRelease,
        Field::Dsize,
        Field::Globaltag,
        Field::Xsection,
    ];

    /// Name of the field on the record side.
    pub fn column(self) -> &'static str {
        match self {
            Field::Process => "process",
            Field::UserComment => "user_comment",
            Field::Energy => "energy",
            Field::Nevents => "nevents",
            Field::CmsswRelease => "cmssw_release",
            Field::Dsize => "dsize",
            Field::Globaltag => "globaltag",
            Field::Xsection => "xsection",
        }
    }

    /// Name of the field in DAS output.
    pub fn key(self) -> &'static str {
        match self {
            Field::Process => "process",
            Field::UserComment => "comment",
            Field::Energy => "energy",
            Field::Nevents => "nevents",
            Field::CmsswRelease => "release",
            Field::Dsize => "size",
            Field::Globaltag => "tag",
            Field::Xsection => "xsection",
        }
    }

    fn load(self, record: &mut Dataset, value: &Value) -> Result<(), DasError> {
        match self {
            Field::Process => record.process = text(self, value)?,
            Field::UserComment => record.user_comment = text(self, value)?,
            Field::CmsswRelease => record.cmssw_release = text(self, value)?,
            Field::Globaltag => record.globaltag = text(self, value)?,
            Field::Nevents => record.nevents = integer(self, value)?,
            Field::Dsize => record.dsize = integer(self, value)?,
            Field::Energy => record.energy = float(self, value)?,
            Field::Xsection => record.xsection = float(self, value)?,
        }
        Ok(())
    }

    fn store(self, record: &Dataset) -> Value {
        match self {
            Field::Process => Value::from(record.process.clone()),
            Field::UserComment => Value::from(record.user_comment.clone()),
            Field::CmsswRelease => Value::from(record.cmssw_release.clone()),
            Field::Globaltag => Value::from(record.globaltag.clone()),
            Field::Nevents => Value::from(record.nevents),
            Field::Dsize => Value::from(record.dsize),
            Field::Energy => Value::from(record.energy),
            Field::Xsection => Value::from(record.xsection),
        }
    }
}

pub fn to_record(value: &Value) -> Result<Dataset, DasError> {
    let name = required_str(value, "name")?;
    let datatype = required_str(value, "datatype")?;
    let mut record = Dataset::new(name, datatype)?;

    for field in Field::ALL {
        let raw = value
            .get(field.key())
            .ok_or_else(|| DasError::MissingField(field.key().to_string()))?;
        field.load(&mut record, raw)?;
    }

    record.creation_time = parse_creation_time(required_str(value, "creation_time")?)?;
    Ok(record)
}

pub fn to_json(record: &Dataset) -> Value {
    let mut object = Map::new();
    object.insert("name".to_string(), Value::from(record.name()));
    object.insert("datatype".to_string(), Value::from(record.datatype().as_str()));
    for field in Field::ALL {
        object.insert(field.key().to_string(), field.store(record));
    }
    object.insert(
        "creation_time".to_string(),
        Value::from(format_creation_time(&record.creation_time)),
    );
    Value::Object(object)
}

fn required_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, DasError> {
    let raw = value
        .get(key)
        .ok_or_else(|| DasError::MissingField(key.to_string()))?;
    raw.as_str().ok_or_else(|| DasError::FieldType {
        field: key.to_string(),
        expected: "a string",
    })
}

fn text(field: Field, value: &Value) -> Result<String, DasError> {
    value
        .as_str()
        .map(|value| value.to_string())
        .ok_or_else(|| DasError::FieldType {
            field: field.key().to_string(),
            expected: "a string",
        })
}

fn integer(field: Field, value: &Value) -> Result<i64, DasError> {
    value.as_i64().ok_or_else(|| DasError::FieldType {
        field: field.key().to_string(),
        expected: "an integer",
    })
}

fn float(field: Field, value: &Value) -> Result<f64, DasError> {
    value.as_f64().ok_or_else(|| DasError::FieldType {
        field: field.key().to_string(),
        expected: "a number",
    })
}
