//! Per-period import leases
//!
//! Two imports of the same schema and period must not interleave their
//! delete and insert steps. Each import holds an exclusive lock file per
//! period for the duration of the replacement.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::reconcile::ReplacementScope;
use super::ImportFailure;
use crate::domain::{ImportSchema, Period};

/// Held locks for every period of one replacement; released on drop
#[derive(Debug)]
pub struct PeriodLease {
    files: Vec<(PathBuf, File)>,
}

impl PeriodLease {
    /// Lock every period of `scope` under `lock_dir`, or fail without
    /// holding anything
    pub fn acquire(lock_dir: &Path, scope: &ReplacementScope) -> Result<Self, ImportFailure> {
        fs::create_dir_all(lock_dir).map_err(|e| ImportFailure::Persistence {
            message: format!("creating lock directory {}: {}", lock_dir.display(), e),
        })?;

        let mut files = Vec::with_capacity(scope.periods.len());
        // Periods are ordered, so concurrent imports lock in the same order
        for period in &scope.periods {
            let path = lock_path(lock_dir, scope.schema, period);
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .map_err(|e| ImportFailure::Persistence {
                    message: format!("opening lock file {}: {}", path.display(), e),
                })?;

            if file.try_lock_exclusive().is_err() {
                // `files` drops here and unlocks whatever was taken
                return Err(ImportFailure::PeriodLocked {
                    period: period.to_string(),
                });
            }
            files.push((path, file));
        }

        Ok(Self { files })
    }

    /// Lock files currently held
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(p, _)| p.as_path())
    }
}

impl Drop for PeriodLease {
    fn drop(&mut self) {
        for (_, file) in &self.files {
            let _ = FileExt::unlock(file);
        }
    }
}

fn lock_path(dir: &Path, schema: ImportSchema, period: &Period) -> PathBuf {
    dir.join(format!("{}-{}.lock", schema, period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn scope(periods: &[(i32, u32)]) -> ReplacementScope {
        ReplacementScope {
            schema: ImportSchema::Performance,
            periods: periods
                .iter()
                .map(|(y, m)| Period::new(*y, *m).unwrap())
                .collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_same_period_cannot_be_leased_twice() {
        let dir = TempDir::new().unwrap();
        let first = PeriodLease::acquire(dir.path(), &scope(&[(2024, 3)])).unwrap();
        assert_eq!(first.paths().count(), 1);

        let err = PeriodLease::acquire(dir.path(), &scope(&[(2024, 2), (2024, 3)])).unwrap_err();
        assert_eq!(
            err,
            ImportFailure::PeriodLocked {
                period: "2024-03".to_string()
            }
        );

        // the failed attempt must not keep February locked
        PeriodLease::acquire(dir.path(), &scope(&[(2024, 2)])).unwrap();
    }

    #[test]
    fn test_lease_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        drop(PeriodLease::acquire(dir.path(), &scope(&[(2024, 3)])).unwrap());
        PeriodLease::acquire(dir.path(), &scope(&[(2024, 3)])).unwrap();
    }

    #[test]
    fn test_different_schemas_do_not_conflict() {
        let dir = TempDir::new().unwrap();
        let _perf = PeriodLease::acquire(dir.path(), &scope(&[(2024, 3)])).unwrap();
        let product = ReplacementScope {
            schema: ImportSchema::Product,
            periods: scope(&[(2024, 3)]).periods,
        };
        PeriodLease::acquire(dir.path(), &product).unwrap();
    }
}
