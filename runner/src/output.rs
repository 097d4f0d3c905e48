use image::RgbImage;
use motiondetect::MotionEvent;
use motiondetect_common::frame::VideoFrame;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::RunnerError;

/// Writes an annotated RGB frame as PNG under `dir`, named after its source.
pub fn save_frame(dir: &Path, source: &Path, frame: &VideoFrame) -> Result<PathBuf, RunnerError> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".into());
    let path = dir.join(format!("{stem}.png"));

    let image = RgbImage::from_raw(frame.info.width, frame.info.height, frame.data.clone())
        .ok_or_else(|| RunnerError::FrameLayout(path.display().to_string()))?;
    image
        .save(&path)
        .map_err(|e| RunnerError::WriteFrame(path.display().to_string(), e))?;
    Ok(path)
}

/// Drains motion events into a JSON-lines file, or stdout when no path is
/// given, until every sender is gone. Returns the number of events written.
pub async fn run_event_writer(
    mut events: UnboundedReceiver<MotionEvent>,
    path: Option<PathBuf>,
) -> Result<u64, RunnerError> {
    let mut out: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match &path {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .map_err(RunnerError::WriteEvents)?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut written = 0u64;
    while let Some(event) = events.recv().await {
        info!(
            kind = ?event.kind,
            frame_number = event.frame_number,
            regions = event.regions.len(),
            "motion event"
        );
        let mut line = serde_json::to_string(&event).map_err(RunnerError::Encode)?;
        line.push('\n');
        out.write_all(line.as_bytes())
            .await
            .map_err(RunnerError::WriteEvents)?;
        written += 1;
    }
    out.flush().await.map_err(RunnerError::WriteEvents)?;
    Ok(written)
}
