use motiondetect_common::frame::{FrameInfo, PixelFormat, VideoFrame};
use std::path::{Path, PathBuf};

use crate::RunnerError;

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Image files in `dir`, sorted by file name so they play back in order.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| RunnerError::ListInput(dir.display().to_string(), e))?;

    let mut frames = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| RunnerError::ListInput(dir.display().to_string(), e))?
            .path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Presentation timestamp of the `index`th frame at a fixed rate.
pub fn pts_ns(index: u64, fps: f64) -> u64 {
    (index as f64 * 1_000_000_000.0 / fps).round() as u64
}

/// Decodes one still image into a packed RGB frame.
pub fn load_frame(path: &Path, index: u64, fps: f64) -> Result<VideoFrame, RunnerError> {
    let rgb = image::open(path)
        .map_err(|e| RunnerError::Decode(path.display().to_string(), e))?
        .to_rgb8();
    let info = FrameInfo::packed(PixelFormat::Rgb, rgb.width(), rgb.height());
    Ok(VideoFrame::new(info, rgb.into_raw(), Some(pts_ns(index, fps))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn lists_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "c.PNG"] {
            RgbImage::new(2, 2).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.PNG"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(matches!(
            list_frames(Path::new("/nonexistent/frames")),
            Err(RunnerError::ListInput(..))
        ));
    }

    #[test]
    fn loads_rgb_frame_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.png");
        RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])).save(&path).unwrap();

        let frame = load_frame(&path, 2, 25.0).unwrap();
        assert_eq!(frame.info, FrameInfo::packed(PixelFormat::Rgb, 3, 2));
        assert_eq!(&frame.data[..3], &[1, 2, 3]);
        assert_eq!(frame.pts_ns, Some(80_000_000));
    }
}
