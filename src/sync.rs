//! Reconciles a freshly imported dataset with the store.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::domain::Dataset;
use crate::error::DasError;
use crate::mapper::to_json;
use crate::store::{DatasetStore, Session};

/// Asks the operator a yes/no question. `default` is the answer assumed when the
/// operator just hits enter.
pub trait Confirm {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, DasError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Inserted,
    Replaced,
    Skipped,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Inserted => write!(f, "inserted"),
            SyncOutcome::Replaced => write!(f, "replaced"),
            SyncOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Inserts `candidate`, replaces the stored record of the same name, or leaves the
/// store alone, depending on what the operator confirms. The store is committed
/// exactly once whichever branch is taken; any error rolls the session back.
pub fn reconcile<S, P>(candidate: Dataset, store: &mut S, prompt: &P) -> Result<SyncOutcome, DasError>
where
    S: DatasetStore + ?Sized,
    P: Confirm + ?Sized,
{
    let name = candidate.name().to_string();
    let mut session = Session::begin(store);

    let outcome = match session.find_by_name(&name)? {
        None => {
            let question = format!("{}\nInsert into the database?", pretty(&candidate)?);
            if prompt.confirm(&question, true)? {
                session.add(candidate)?;
                SyncOutcome::Inserted
            } else {
                SyncOutcome::Skipped
            }
        }
        Some(existing) => {
            let question = format!(
                "Replace existing entry:\n{}\nby new entry:\n{}\n?",
                pretty(&existing)?,
                pretty(&candidate)?
            );
            if prompt.confirm(&question, false)? {
                session.remove(&existing)?;
                session.add(candidate)?;
                SyncOutcome::Replaced
            } else {
                SyncOutcome::Skipped
            }
        }
    };

    session.commit()?;
    info!(dataset = %name, %outcome, "dataset reconciled");
    Ok(outcome)
}

fn pretty(dataset: &Dataset) -> Result<String, DasError> {
    serde_json::to_string_pretty(&to_json(dataset)).map_err(|err| DasError::Prompt(err.to_string()))
}
