mod output;
mod source;

use motiondetect::detector::FrameOutcome;
use motiondetect::{FrameTransform, MotionDetectElement, MotionEvent};
use motiondetect_common::config::Config;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to list input directory {0}: {1}")]
    ListInput(String, std::io::Error),
    #[error("failed to decode frame {0}: {1}")]
    Decode(String, image::ImageError),
    #[error("frame buffer does not match its geometry: {0}")]
    FrameLayout(String),
    #[error("failed to write annotated frame {0}: {1}")]
    WriteFrame(String, image::ImageError),
    #[error("failed to write events: {0}")]
    WriteEvents(std::io::Error),
    #[error("failed to encode event: {0}")]
    Encode(serde_json::Error),
}

#[derive(Debug, Default)]
struct RunStats {
    frames: u64,
    analysed: u64,
    with_motion: u64,
    skipped: u64,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("motiondetect.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        input = %config.input.directory.display(),
        fps = config.input.fps,
        enabled = config.filter.enabled,
        sensitivity = config.filter.sensitivity,
        min_active_frames = config.filter.min_active_frames,
        min_cooldown_frames = config.filter.min_cooldown_frames,
        "starting motiondetect runner"
    );

    let frames = match source::list_frames(&config.input.directory) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "failed to list input frames");
            std::process::exit(1);
        }
    };
    info!(count = frames.len(), "found input frames");

    let mut element = match MotionDetectElement::new(config.filter.clone()) {
        Ok(el) => el,
        Err(e) => {
            error!(error = %e, "failed to configure motion detection");
            std::process::exit(1);
        }
    };

    if let Some(dir) = &config.output.directory {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!(error = %e, dir = %dir.display(), "failed to create output directory");
            std::process::exit(1);
        }
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<MotionEvent>();
    element.add_sink(tx);
    let writer = tokio::spawn(output::run_event_writer(rx, config.output.events_path.clone()));

    // Frames are processed synchronously, one at a time, off the async threads.
    let run_config = config.clone();
    let stats = match tokio::task::spawn_blocking(move || run_frames(element, &frames, &run_config))
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "frame loop panicked");
            std::process::exit(1);
        }
    };

    match writer.await {
        Ok(Ok(events)) => info!(
            frames = stats.frames,
            analysed = stats.analysed,
            with_motion = stats.with_motion,
            skipped = stats.skipped,
            events,
            "finished"
        ),
        Ok(Err(e)) => {
            error!(error = %e, "event writer failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "event writer task failed");
            std::process::exit(1);
        }
    }
}

/// Feeds every frame through the element. Dropping the element at the end
/// closes the event channel so the writer task can finish.
fn run_frames(mut element: MotionDetectElement, frames: &[PathBuf], config: &Config) -> RunStats {
    let mut stats = RunStats::default();

    for (index, path) in frames.iter().enumerate() {
        let mut frame = match source::load_frame(path, index as u64, config.input.fps) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "failed to load frame, skipping");
                stats.skipped += 1;
                continue;
            }
        };

        let report = element.process_frame(&mut frame);
        stats.frames += 1;
        if report.outcome == FrameOutcome::Analysed {
            stats.analysed += 1;
        }
        if !report.regions.is_empty() {
            stats.with_motion += 1;
        }
        debug!(
            frame = %path.display(),
            frame_number = report.frame_number,
            outcome = ?report.outcome,
            regions = report.regions.len(),
            state = ?report.state,
            "processed frame"
        );

        if let Some(dir) = &config.output.directory {
            if let Err(e) = output::save_frame(dir, path, &frame) {
                warn!(error = %e, "failed to write annotated frame");
            }
        }

        if stats.frames % 100 == 0 {
            debug!(total = stats.frames, "frames processed");
        }
    }

    info!(element = element.name(), "input exhausted");
    stats
}
