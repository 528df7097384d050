pub mod config;
pub mod report;

use crate::config::CliConfig;
use anyhow::{Context, Result};
use learnhub_core::reports::ReportDataset;
use learnhub_core::store::Snapshot;
use tracing::info;

pub struct CommandContext {
    pub config: CliConfig,
}

impl CommandContext {
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Load the configured snapshot
    pub fn snapshot(&self) -> Result<Snapshot> {
        let path = self.config.data_path()?;
        let snapshot = Snapshot::load(path).with_context(|| format!("loading snapshot {}", path.display()))?;
        info!(
            "Loaded {} users, {} courses, {} enrollments from {}",
            snapshot.users.len(),
            snapshot.courses.len(),
            snapshot.enrollments.len(),
            path.display()
        );
        Ok(snapshot)
    }

    pub fn dataset(&self) -> Result<ReportDataset> {
        Ok(ReportDataset::from_snapshot(self.snapshot()?))
    }
}

/// Print record counts of the snapshot
pub fn inspect(ctx: &CommandContext) -> Result<()> {
    let snapshot = ctx.snapshot()?;
    println!("Snapshot: {}", ctx.config.data_path()?.display());
    println!("  users        {:>6}", snapshot.users.len());
    println!("  courses      {:>6}", snapshot.courses.len());
    println!("  modules      {:>6}", snapshot.modules.len());
    println!("  enrollments  {:>6}", snapshot.enrollments.len());
    println!("  progress     {:>6}", snapshot.progress.len());
    Ok(())
}
