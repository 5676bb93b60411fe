//! Work units and the shared work queue
//!
//! Every immediate subdirectory of the input root is one unit. All units are
//! pushed before any worker starts and the queue is closed right after, so a
//! worker that finds the queue empty knows the run is drained.

use crate::error::{PipelineError, Result};
use crossbeam_channel::{unbounded, Receiver};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One subdirectory of the input root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Directory name relative to the root
    pub name: String,
    /// Full path to the directory
    pub path: PathBuf,
}

impl WorkUnit {
    pub fn new(root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: root.join(name),
        }
    }
}

/// Enumerate the immediate subdirectories of `root`
pub fn enumerate_units(root: &Path) -> Result<Vec<WorkUnit>> {
    if !root.is_dir() {
        return Err(PipelineError::InputRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut units = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(PipelineError::InputRoot {
                    path: root.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry under input root");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            debug!(path = ?entry.path(), "Ignoring non-directory at input root");
            continue;
        }

        units.push(WorkUnit {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.into_path(),
        });
    }

    Ok(units)
}

/// Push every unit into a fresh queue and close it
pub fn load_queue(units: Vec<WorkUnit>) -> Result<UnitReceiver> {
    let (sender, receiver) = unbounded();
    for unit in units {
        sender.send(unit).map_err(|_| PipelineError::ChannelClosed)?;
    }
    // Dropping the only sender closes the queue
    drop(sender);

    Ok(UnitReceiver { receiver })
}

/// Consumer side of the work queue (clone for each worker)
#[derive(Clone)]
pub struct UnitReceiver {
    receiver: Receiver<WorkUnit>,
}

impl UnitReceiver {
    /// Take the next unit; `None` once the closed queue is drained.
    ///
    /// Each unit is handed to exactly one caller.
    pub fn claim(&self) -> Option<WorkUnit> {
        self.receiver.recv().ok()
    }

    /// Units not yet claimed
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Regular files directly inside a unit, without descending.
///
/// Fails only when the unit directory itself cannot be read.
pub fn list_unit_files(unit: &WorkUnit) -> std::result::Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(&unit.path).min_depth(1).max_depth(1).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(e),
            Err(e) => debug!(unit = %unit.name, error = %e, "Skipping unreadable entry"),
        }
    }

    Ok(files)
}
