use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DasError;

/// Text encoding of `Dataset::creation_time`, both on the wire and on disk.
pub const CREATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Mc,
    Data,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Mc => "mc",
            Datatype::Data => "data",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = DasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mc" => Ok(Datatype::Mc),
            "data" => Ok(Datatype::Data),
            other => Err(DasError::InvalidDatatype(other.to_string())),
        }
    }
}

/// One sample known to DAS, as kept in the dataset store.
///
/// `name` and `datatype` form the identity and can only be set through
/// [`Dataset::new`]; everything else is plain data filled in by the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetFields")]
pub struct Dataset {
    name: String,
    datatype: Datatype,
    pub process: String,
    pub cmssw_release: String,
    pub globaltag: String,
    pub user_comment: String,
    pub nevents: i64,
    pub dsize: i64,
    pub xsection: f64,
    pub energy: f64,
    #[serde(with = "creation_time")]
    pub creation_time: NaiveDateTime,
}

impl Dataset {
    pub fn new(name: &str, datatype: &str) -> Result<Self, DasError> {
        if name.trim().is_empty() {
            return Err(DasError::InvalidDatasetName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            datatype: datatype.parse()?,
            process: String::new(),
            cmssw_release: String::new(),
            globaltag: String::new(),
            user_comment: String::new(),
            nevents: 0,
            dsize: 0,
            xsection: 0.0,
            energy: 0.0,
            creation_time: NaiveDateTime::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.datatype)
    }
}

pub fn parse_creation_time(value: &str) -> Result<NaiveDateTime, DasError> {
    NaiveDateTime::parse_from_str(value, CREATION_TIME_FORMAT)
        .map_err(|_| DasError::TimestampParse(value.to_string()))
}

pub fn format_creation_time(value: &NaiveDateTime) -> String {
    value.format(CREATION_TIME_FORMAT).to_string()
}

#[derive(Deserialize)]
struct DatasetFields {
    name: String,
    datatype: Datatype,
    process: String,
    cmssw_release: String,
    globaltag: String,
    user_comment: String,
    nevents: i64,
    dsize: i64,
    xsection: f64,
    energy: f64,
    #[serde(with = "creation_time")]
    creation_time: NaiveDateTime,
}

impl TryFrom<DatasetFields> for Dataset {
    type Error = DasError;

    fn try_from(fields: DatasetFields) -> Result<Self, Self::Error> {
        let mut dataset = Dataset::new(&fields.name, fields.datatype.as_str())?;
        dataset.process = fields.process;
        dataset.cmssw_release = fields.cmssw_release;
        dataset.globaltag = fields.globaltag;
        dataset.user_comment = fields.user_comment;
        dataset.nevents = fields.nevents;
        dataset.dsize = fields.dsize;
        dataset.xsection = fields.xsection;
        dataset.energy = fields.energy;
        dataset.creation_time = fields.creation_time;
        Ok(dataset)
    }
}

mod creation_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_creation_time(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_creation_time(&raw).map_err(serde::de::Error::custom)
    }
}
