use std::fmt;
use std::path::PathBuf;

use crate::engine::models::SyncOutcome;
use crate::release::ResolvedRelease;

// One step of a sync run. Failures leave the machine through `Err` instead of
// a dedicated variant.
#[derive(Clone, Debug)]
pub enum SyncStep {
    Start,
    ResolveLatest,
    CheckInstalled {
        release: ResolvedRelease,
    },
    Download {
        release: ResolvedRelease,
    },
    Extract {
        release: ResolvedRelease,
        archive_path: PathBuf,
    },
    Cleanup {
        release: ResolvedRelease,
        archive_path: PathBuf,
    },
    Done(SyncOutcome),
}

impl SyncStep {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStep::Start => "start",
            SyncStep::ResolveLatest => "resolve_latest",
            SyncStep::CheckInstalled { .. } => "check_installed",
            SyncStep::Download { .. } => "download",
            SyncStep::Extract { .. } => "extract",
            SyncStep::Cleanup { .. } => "cleanup",
            SyncStep::Done(SyncOutcome::AlreadyInstalled { .. }) => "done_already_present",
            SyncStep::Done(SyncOutcome::Installed { .. }) => "done",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
