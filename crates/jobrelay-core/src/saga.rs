//! Multi-entity job creation and deletion.
//!
//! The store offers no multi-table transaction on this path, so creation is
//! a saga: Job, Action, and Trigger are written in forward order and undone
//! in reverse order by compensating deletes when a later write fails. After
//! `create` returns, either all three rows exist or none do.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::store::EntityStore;

// ---------------------------------------------------------------------------
// Creation spec
// ---------------------------------------------------------------------------

/// Job metadata carried by a creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// One action or trigger item: a name plus an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

/// Everything a single creation writes as one logical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub info: JobInfo,
    pub action: ItemSpec,
    pub trigger: ItemSpec,
}

// ---------------------------------------------------------------------------
// Saga
// ---------------------------------------------------------------------------

/// Completed steps that need undoing when a later step fails.
#[derive(Debug)]
enum Compensation {
    Job,
    Action,
}

/// Orchestrates all-or-nothing job creation and unconditional deletion.
pub struct JobSaga<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> JobSaga<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a job with its action and trigger, returning the fresh job
    /// identifier. On partial failure every already-written row is deleted
    /// and the original store error is returned.
    pub fn create(&self, spec: &JobSpec) -> Result<String> {
        let job_id = self.store.insert_job(
            &spec.info.name,
            &spec.info.description,
            &spec.info.author,
            &spec.info.members,
        )?;
        let mut done = vec![Compensation::Job];

        if let Err(err) = self
            .store
            .insert_action(&job_id, &spec.action.name, &spec.action.payload)
        {
            self.unwind(&job_id, done);
            return Err(err);
        }
        done.push(Compensation::Action);

        if let Err(err) = self
            .store
            .insert_trigger(&job_id, &spec.trigger.name, &spec.trigger.payload)
        {
            self.unwind(&job_id, done);
            return Err(err);
        }

        Ok(job_id)
    }

    /// Remove every row for the job identifier, ignoring individual delete
    /// failures. Calling this twice observes the same outcome: no rows, no
    /// error.
    pub fn delete(&self, job_id: &str) {
        for (entity, result) in [
            ("action", self.store.delete_action(job_id)),
            ("trigger", self.store.delete_trigger(job_id)),
            ("job", self.store.delete_job(job_id)),
        ] {
            if let Err(err) = result {
                tracing::warn!(
                    job_id,
                    entity,
                    error = %err,
                    detail = err.detail().unwrap_or_default(),
                    "delete failed, continuing"
                );
            }
        }
    }

    /// Run the compensation stack in reverse order. A compensating delete
    /// that itself fails is logged for reconciliation; the caller still gets
    /// the original creation error.
    fn unwind(&self, job_id: &str, stack: Vec<Compensation>) {
        for step in stack.into_iter().rev() {
            let result = match step {
                Compensation::Action => self.store.delete_action(job_id),
                Compensation::Job => self.store.delete_job(job_id),
            };
            if let Err(err) = result {
                tracing::warn!(
                    job_id,
                    step = ?step,
                    error = %err,
                    detail = err.detail().unwrap_or_default(),
                    "compensating delete failed, store needs reconciliation"
                );
            }
        }
    }
}
