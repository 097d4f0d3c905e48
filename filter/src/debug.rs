use chrono::Utc;
use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum DebugDumpError {
    #[error("failed to create debug directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(String, image::ImageError),
}

/// Writes intermediate detection images for offline inspection.
///
/// Each run gets its own subdirectory named after its UTC start time so
/// repeated runs never overwrite each other.
#[derive(Debug)]
pub struct DebugDumper {
    run_dir: PathBuf,
    created: bool,
}

impl DebugDumper {
    pub fn new(root: &Path) -> Self {
        let run = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        Self {
            run_dir: root.join(run),
            created: false,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn dump(
        &mut self,
        frame_number: u64,
        stage: &str,
        image: &GrayImage,
    ) -> Result<PathBuf, DebugDumpError> {
        if !self.created {
            std::fs::create_dir_all(&self.run_dir)
                .map_err(|e| DebugDumpError::CreateDir(self.run_dir.display().to_string(), e))?;
            debug!(dir = %self.run_dir.display(), "created debug directory");
            self.created = true;
        }
        let path = self.run_dir.join(format!("{frame_number:06}-{stage}.png"));
        image
            .save(&path)
            .map_err(|e| DebugDumpError::Write(path.display().to_string(), e))?;
        Ok(path)
    }

    /// Like [`dump`](Self::dump) but only logs failures.
    pub fn dump_or_warn(&mut self, frame_number: u64, stage: &str, image: &GrayImage) {
        if let Err(e) = self.dump(frame_number, stage, image) {
            warn!(error = %e, frame_number, stage, "failed to write debug image");
        }
    }
}
