use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::das::{Clock, DasClient, DasQuery, Transport};
use crate::domain::Dataset;
use crate::error::DasError;
use crate::mapper::{to_json, to_record};
use crate::store::DatasetStore;
use crate::sync::{Confirm, SyncOutcome, reconcile};

/// What the operator supplies on top of what DAS knows about a sample.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub sample: String,
    pub process: Option<String>,
    pub xsection: f64,
    pub energy: f64,
    pub comment: String,
    pub idx: u32,
}

impl ImportRequest {
    pub fn new(sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            process: None,
            xsection: 0.0,
            energy: 0.0,
            comment: String::new(),
            idx: 0,
        }
    }

    pub fn dataset_query(&self) -> DasQuery {
        DasQuery::new(
            format!(
                "dataset={} | grep dataset.name, dataset.nevents, dataset.size, dataset.tag, dataset.datatype, dataset.creation_time",
                self.sample
            ),
            self.idx,
            1,
        )
    }

    pub fn release_query(&self) -> DasQuery {
        DasQuery::new(
            format!("release dataset={} | grep release.name", self.sample),
            self.idx,
            1,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub name: String,
    pub outcome: SyncOutcome,
    pub record: Value,
}

pub struct Importer<T: Transport, C: Clock> {
    client: DasClient<T, C>,
}

impl<T: Transport, C: Clock> Importer<T, C> {
    pub fn new(client: DasClient<T, C>) -> Self {
        Self { client }
    }

    /// Queries DAS for `request.sample` and builds the record to import. Nothing is
    /// written anywhere.
    pub fn resolve(&self, request: &ImportRequest) -> Result<Dataset, DasError> {
        info!(sample = %request.sample, "querying DAS");
        let datasets = self.client.fetch(&request.dataset_query())?.into_document()?;
        let releases = self.client.fetch(&request.release_query())?.into_document()?;
        let merged = merge(&datasets, &releases, request)?;
        to_record(&Value::Object(merged))
    }

    pub fn import<S, P>(
        &self,
        request: &ImportRequest,
        store: &mut S,
        prompt: &P,
    ) -> Result<ImportReport, DasError>
    where
        S: DatasetStore + ?Sized,
        P: Confirm + ?Sized,
    {
        let dataset = self.resolve(request)?;
        let name = dataset.name().to_string();
        let record = to_json(&dataset);
        let outcome = reconcile(dataset, store, prompt)?;
        Ok(ImportReport {
            name,
            outcome,
            record,
        })
    }
}

/// Combines the dataset and release answers with the operator's values into one
/// DAS-shaped object.
pub fn merge(
    datasets: &Value,
    releases: &Value,
    request: &ImportRequest,
) -> Result<Map<String, Value>, DasError> {
    let shape_error = || {
        DasError::ShapeMismatch(format!("{datasets}\n{releases}"))
    };
    let mut dataset = single_entry(datasets, "dataset")
        .cloned()
        .ok_or_else(shape_error)?;
    let release = single_entry(releases, "release")
        .and_then(|entry| entry.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(shape_error)?;

    let process = match &request.process {
        Some(process) => process.clone(),
        None => {
            let name = dataset.get("name").and_then(Value::as_str).unwrap_or_default();
            default_process(name).ok_or_else(|| DasError::ProcessName(name.to_string()))?
        }
    };

    dataset.insert("release".to_string(), Value::from(release));
    dataset.insert("process".to_string(), Value::from(process));
    dataset.insert("xsection".to_string(), Value::from(request.xsection));
    dataset.insert("energy".to_string(), Value::from(request.energy));
    dataset.insert("comment".to_string(), Value::from(request.comment.clone()));
    Ok(dataset)
}

/// Primary dataset name segment, `TTJets` for `/TTJets/Summer12-v1/AODSIM`.
pub fn default_process(name: &str) -> Option<String> {
    name.split('/')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
}

// DAS answers `[{"<key>": [{...}]}]`; exactly one row holding exactly one entry is
// accepted. Responses that kept their service headers wrap the rows in `data`.
fn single_entry<'a>(document: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    let rows = match document {
        Value::Array(rows) => rows,
        Value::Object(object) => object.get("data")?.as_array()?,
        _ => return None,
    };
    let [row] = rows.as_slice() else {
        return None;
    };
    let entries = row.as_object()?.get(key)?.as_array()?;
    let [entry] = entries.as_slice() else {
        return None;
    };
    entry.as_object()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn process_defaults_to_primary_name() {
        assert_eq!(
            default_process("/TTJets/Summer12-v1/AODSIM").as_deref(),
            Some("TTJets")
        );
        assert_eq!(default_process("TTJets"), None);
    }

    #[test]
    fn queries_carry_sample() {
        let request = ImportRequest::new("/A/B/C");
        assert!(request.dataset_query().input.starts_with("dataset=/A/B/C | grep"));
        assert_eq!(
            request.release_query().input,
            "release dataset=/A/B/C | grep release.name"
        );
        assert_eq!(request.release_query().limit, 1);
    }

    #[test]
    fn extra_entries_are_rejected() {
        let datasets = json!([{"dataset": [{"name": "/A/B/C"}, {"name": "/A/B/D"}]}]);
        let releases = json!([{"release": [{"name": "CMSSW_5_3_7"}]}]);
        let err = merge(&datasets, &releases, &ImportRequest::new("/A/B/C")).unwrap_err();
        assert!(matches!(err, DasError::ShapeMismatch(_)));
    }
}
