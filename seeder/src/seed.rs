//! Drives the two seeding phases for one run.

use crate::SeedError;
use crate::config::SeedConfig;
use crate::credentials::{AdminOutcome, ensure_admin_user};
use crate::residents::{ImportOutcome, ensure_residents_data};
use crate::store::DocumentStore;

/// What each phase did. `None` means the phase was not scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin: Option<AdminOutcome>,
    pub residents: Option<ImportOutcome>,
}

/// Run the admin bootstrap, then the residents import, as `config.mode`
/// allows. The first error aborts the run.
pub async fn run_seed(
    store: &dyn DocumentStore,
    config: &SeedConfig,
) -> Result<SeedReport, SeedError> {
    let mode = config.mode;
    if !mode.run_admin() && !mode.run_residents() {
        tracing::warn!("--admin-only and --residents-only both set: each disables the other phase, nothing to do");
    }

    let mut report = SeedReport::default();
    if mode.run_admin() {
        report.admin = Some(ensure_admin_user(store, &config.admin).await?);
    }
    if mode.run_residents() {
        report.residents = Some(ensure_residents_data(store, &config.residents_json).await?);
    }
    Ok(report)
}
