use assert_matches::assert_matches;
use serde_json::{Value, json};

use das_import::domain::{Dataset, Datatype};
use das_import::error::DasError;
use das_import::mapper::{Field, to_json, to_record};

fn sample() -> Value {
    json!({
        "name": "/DoubleMu/Run2012A-13Jul2012-v1/AOD",
        "datatype": "data",
        "process": "DoubleMu",
        "comment": "golden json applied",
        "energy": 8.0,
        "nevents": 7_431_514,
        "release": "CMSSW_5_3_2_patch4",
        "size": 1_234_567_890_123_i64,
        "tag": "FT_53_V6_AN1::All",
        "xsection": 1.5,
        "creation_time": "2012-07-21 03:44:12"
    })
}

#[test]
fn record_fields_follow_table() {
    let record = to_record(&sample()).unwrap();
    assert_eq!(record.name(), "/DoubleMu/Run2012A-13Jul2012-v1/AOD");
    assert_eq!(record.datatype(), Datatype::Data);
    assert_eq!(record.process, "DoubleMu");
    assert_eq!(record.user_comment, "golden json applied");
    assert_eq!(record.cmssw_release, "CMSSW_5_3_2_patch4");
    assert_eq!(record.globaltag, "FT_53_V6_AN1::All");
    assert_eq!(record.nevents, 7_431_514);
    assert_eq!(record.dsize, 1_234_567_890_123);
    assert_eq!(record.energy, 8.0);
    assert_eq!(record.xsection, 1.5);
}

fn assert_same_field(output: &Value, input: &Value, key: &str) {
    if input[key].is_number() {
        assert_eq!(output[key].as_f64(), input[key].as_f64(), "{key}");
    } else {
        assert_eq!(output[key], input[key], "{key}");
    }
}

#[test]
fn json_round_trip_reproduces_mapped_fields() {
    let input = sample();
    let output = to_json(&to_record(&input).unwrap());
    for field in Field::ALL {
        assert_same_field(&output, &input, field.key());
    }
    for key in ["name", "datatype", "creation_time"] {
        assert_eq!(output[key], input[key], "{key}");
    }
}

#[test]
fn integral_floats_round_trip_by_value() {
    let mut input = sample();
    input["energy"] = json!(13);
    input["xsection"] = json!(225);
    let output = to_json(&to_record(&input).unwrap());
    for field in Field::ALL {
        assert_same_field(&output, &input, field.key());
    }
    assert_eq!(output["energy"], json!(13.0));
    assert_eq!(output["nevents"], input["nevents"]);
}

#[test]
fn record_round_trip_is_identity() {
    let record = to_record(&sample()).unwrap();
    assert_eq!(to_record(&to_json(&record)).unwrap(), record);
}

#[test]
fn integer_energy_is_accepted() {
    let mut input = sample();
    input["energy"] = json!(13);
    assert_eq!(to_record(&input).unwrap().energy, 13.0);
}

#[test]
fn unknown_datatype_rejected() {
    let mut input = sample();
    input["datatype"] = json!("simulation");
    assert_matches!(to_record(&input), Err(DasError::InvalidDatatype(_)));
}

#[test]
fn missing_mapped_field_reported_by_service_name() {
    let mut input = sample();
    input.as_object_mut().unwrap().remove("tag");
    assert_matches!(to_record(&input), Err(DasError::MissingField(field)) if field == "tag");
}

#[test]
fn wrong_field_kind_rejected() {
    let mut input = sample();
    input["nevents"] = json!("many");
    assert_matches!(
        to_record(&input),
        Err(DasError::FieldType { field, .. }) if field == "nevents"
    );
}

#[test]
fn creation_time_format_is_strict() {
    for bad in ["2012-07-21T03:44:12", "2012-07-21", "21/07/2012 03:44:12"] {
        let mut input = sample();
        input["creation_time"] = json!(bad);
        assert_matches!(to_record(&input), Err(DasError::TimestampParse(_)), "{bad}");
    }
}

#[test]
fn to_json_uses_service_names() {
    let mut record = Dataset::new("/A/B/C", "mc").unwrap();
    record.globaltag = "START53_V7A::All".to_string();
    let value = to_json(&record);
    assert_eq!(value["tag"], "START53_V7A::All");
    assert!(value.get("globaltag").is_none());
    assert_eq!(value["creation_time"], "1970-01-01 00:00:00");
}
