use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use groundwork_core::error::{GroundworkError, Result, SubjectFailure};
use groundwork_core::migration::Migration;

use super::store::ProgressStore;

/// Orchestrates one migration run: identity resolution, grouping by subject,
/// pending-set computation, ordered application, progress recording.
///
/// Progress is recorded once per subject per run (the highest version
/// applied), not once per unit. A batch that fails partway leaves its
/// earlier units applied but unrecorded, so the next run re-attempts the
/// batch from its first pending unit; non-idempotent units must tolerate
/// that.
pub struct MigrationEngine<S> {
    store: S,
    units: Vec<Arc<dyn Migration>>,
}

struct PlannedUnit {
    version: String,
    unit: Arc<dyn Migration>,
}

impl<S: ProgressStore> MigrationEngine<S> {
    pub fn new(store: S, units: Vec<Arc<dyn Migration>>) -> Self {
        Self { store, units }
    }

    /// Apply every pending migration, grouped by subject.
    ///
    /// Subjects are attempted independently: a failed batch does not stop
    /// the others, and every failure is surfaced together as
    /// [`GroundworkError::MigrationsFailed`] once all subjects have been
    /// attempted. Store errors are fatal and abort the run immediately.
    pub async fn run(&self) -> Result<()> {
        let plan = self.plan()?;

        self.store.ensure_schema().await?;

        // Pending sets for every subject are computed before any unit runs.
        let mut batches = Vec::new();
        for (subject, units) in plan {
            let current = self.store.current_version(&subject).await?;
            let total = units.len();
            let pending: Vec<PlannedUnit> = match &current {
                Some(current) => units
                    .into_iter()
                    .filter(|u| u.version.as_str() > current.as_str())
                    .collect(),
                None => units,
            };

            if pending.is_empty() {
                debug!("Subject '{}' is up to date, skipping", subject);
                continue;
            }

            debug!(
                "Subject '{}': {} of {} unit(s) pending (current version: {:?})",
                subject,
                pending.len(),
                total,
                current
            );
            batches.push((subject, pending));
        }

        let mut failures = Vec::new();
        for (subject, pending) in batches {
            if let Some(failure) = self.apply_batch(&subject, &pending).await? {
                warn!("{}", failure);
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(GroundworkError::MigrationsFailed(failures))
        }
    }

    /// Resolve every unit's identity and group by subject, each batch sorted
    /// by version ascending. A malformed identity aborts the run here,
    /// before anything executes.
    fn plan(&self) -> Result<BTreeMap<String, Vec<PlannedUnit>>> {
        let mut plan: BTreeMap<String, Vec<PlannedUnit>> = BTreeMap::new();

        for unit in &self.units {
            let subject = unit.subject()?;
            let version = unit.version()?;
            if subject.is_empty() || version.is_empty() {
                return Err(GroundworkError::MalformedIdentity(format!(
                    "subject and version must be non-empty (got '{}', '{}')",
                    subject, version
                )));
            }

            plan.entry(subject).or_default().push(PlannedUnit {
                version,
                unit: Arc::clone(unit),
            });
        }

        for units in plan.values_mut() {
            // Stable sort: registration order breaks ties between equal versions.
            units.sort_by(|a, b| a.version.cmp(&b.version));
        }

        Ok(plan)
    }

    /// Apply one subject's pending units in ascending version order,
    /// stopping at the first failure; on full success record one progress
    /// row for the highest version applied.
    ///
    /// `Ok(Some(_))` is an apply failure for the caller to collect; `Err`
    /// is a fatal store error.
    async fn apply_batch(
        &self,
        subject: &str,
        pending: &[PlannedUnit],
    ) -> Result<Option<SubjectFailure>> {
        for planned in pending {
            info!("Applying migration {}@{}", subject, planned.version);
            if let Err(e) = planned.unit.apply().await {
                return Ok(Some(SubjectFailure {
                    subject: subject.to_string(),
                    version: planned.version.clone(),
                    source: Box::new(e),
                }));
            }
        }

        let Some(last) = pending.last() else {
            return Ok(None);
        };

        self.store.append(subject, &last.version).await?;
        info!("Subject '{}' migrated to version {}", subject, last.version);
        Ok(None)
    }
}
