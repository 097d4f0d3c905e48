use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for the runner binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tunables of the motion detection filter.
///
/// Every field has a default so an empty `[filter]` table is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Minimum per-pixel intensity difference (1..=255) that counts as change.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u32,
    /// Side of the square block the difference is averaged over. 1 = per pixel.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    /// Radius of the erode-then-dilate pass. 0 disables denoising.
    #[serde(default = "default_denoise_radius")]
    pub denoise_radius: u32,
    #[serde(default)]
    pub connectivity: Connectivity,
    /// Absolute minimum region area in pixels. Overrides the fraction when set.
    #[serde(default)]
    pub min_region_area: Option<u32>,
    #[serde(default = "default_min_region_area_fraction")]
    pub min_region_area_fraction: f64,
    #[serde(default = "default_debounce_frames")]
    pub min_active_frames: u32,
    #[serde(default = "default_debounce_frames")]
    pub min_cooldown_frames: u32,
    /// Replace the reference frame every Nth processed frame.
    #[serde(default = "default_reference_interval")]
    pub reference_interval: u32,
    #[serde(default = "default_draw_overlay")]
    pub draw_overlay: bool,
    #[serde(default = "default_overlay_color")]
    pub overlay_color: [u8; 3],
    /// Grayscale image; black pixels are excluded from detection.
    #[serde(default)]
    pub mask_path: Option<PathBuf>,
    #[serde(default)]
    pub debug_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Directory of still images, played back in file name order.
    pub directory: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where annotated frames are written. Nothing is written when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// JSON-lines event log. Events go to stdout when unset.
    #[serde(default)]
    pub events_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sensitivity: default_sensitivity(),
            block_size: default_block_size(),
            denoise_radius: default_denoise_radius(),
            connectivity: Connectivity::default(),
            min_region_area: None,
            min_region_area_fraction: default_min_region_area_fraction(),
            min_active_frames: default_debounce_frames(),
            min_cooldown_frames: default_debounce_frames(),
            reference_interval: default_reference_interval(),
            draw_overlay: default_draw_overlay(),
            overlay_color: default_overlay_color(),
            mask_path: None,
            debug_directory: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.filter.validate()?;
        if !(config.input.fps.is_finite() && config.input.fps > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "input.fps",
                value: config.input.fps.to_string(),
                reason: "must be a positive number",
            });
        }
        Ok(config)
    }
}

impl FilterConfig {
    /// Checks every bounded field, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "sensitivity",
            self.sensitivity,
            (1..=255).contains(&self.sensitivity),
            "must be within 1..=255",
        )?;
        check(
            "block_size",
            self.block_size,
            (1..=64).contains(&self.block_size),
            "must be within 1..=64",
        )?;
        check(
            "denoise_radius",
            self.denoise_radius,
            self.denoise_radius <= 8,
            "must be at most 8",
        )?;
        if let Some(area) = self.min_region_area {
            check("min_region_area", area, area >= 1, "must be at least 1")?;
        }
        let fraction = self.min_region_area_fraction;
        check(
            "min_region_area_fraction",
            fraction,
            fraction > 0.0 && fraction <= 1.0,
            "must be within (0, 1]",
        )?;
        check(
            "min_active_frames",
            self.min_active_frames,
            self.min_active_frames >= 1,
            "must be at least 1",
        )?;
        check(
            "min_cooldown_frames",
            self.min_cooldown_frames,
            self.min_cooldown_frames >= 1,
            "must be at least 1",
        )?;
        check(
            "reference_interval",
            self.reference_interval,
            self.reference_interval >= 1,
            "must be at least 1",
        )?;
        Ok(())
    }

    /// Minimum region area in pixels for a frame of the given size.
    pub fn resolve_min_region_area(&self, width: u32, height: u32) -> u32 {
        match self.min_region_area {
            Some(area) => area,
            None => {
                let pixels = width as f64 * height as f64;
                ((self.min_region_area_fraction * pixels).ceil() as u32).max(1)
            }
        }
    }
}

fn check<T: ToString>(
    field: &'static str,
    value: T,
    ok: bool,
    reason: &'static str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            reason,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid value {value} for {field}: {reason}")]
    OutOfRange {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("failed to load mask {path}: {reason}")]
    Mask { path: String, reason: String },
}

// Default value functions
fn default_enabled() -> bool {
    true
}
fn default_sensitivity() -> u32 {
    128
}
fn default_block_size() -> u32 {
    1
}
fn default_denoise_radius() -> u32 {
    1
}
fn default_min_region_area_fraction() -> f64 {
    0.01
}
fn default_debounce_frames() -> u32 {
    1
}
fn default_reference_interval() -> u32 {
    1
}
fn default_draw_overlay() -> bool {
    true
}
fn default_overlay_color() -> [u8; 3] {
    [255, 0, 0]
}
fn default_fps() -> f64 {
    25.0
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_filter_table_uses_defaults() {
        let config = Config::parse(
            r#"
            [input]
            directory = "frames"
            "#,
        )
        .unwrap();
        assert_eq!(config.filter, FilterConfig::default());
        assert!(config.filter.enabled);
        assert!(config.filter.draw_overlay);
        assert_eq!(config.filter.min_active_frames, 1);
        assert_eq!(config.filter.min_cooldown_frames, 1);
        assert_eq!(config.input.fps, 25.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.output.directory.is_none());
    }

    #[test]
    fn parses_filter_overrides() {
        let config = Config::parse(
            r#"
            [filter]
            sensitivity = 10
            min_region_area = 100
            connectivity = "four"
            overlay_color = [0, 255, 0]

            [input]
            directory = "frames"
            fps = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.filter.sensitivity, 10);
        assert_eq!(config.filter.min_region_area, Some(100));
        assert_eq!(config.filter.connectivity, Connectivity::Four);
        assert_eq!(config.filter.overlay_color, [0, 255, 0]);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = Config::parse(
            r#"
            [filter]
            sensitivity = -5

            [input]
            directory = "frames"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_are_reported() {
        let mut config = FilterConfig::default();
        config.sensitivity = 300;
        match config.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, "sensitivity"),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut config = FilterConfig::default();
        config.min_active_frames = 0;
        assert!(config.validate().is_err());

        let mut config = FilterConfig::default();
        config.min_region_area_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn min_region_area_resolution() {
        let mut config = FilterConfig::default();
        // 1% of 100x100
        assert_eq!(config.resolve_min_region_area(100, 100), 100);
        // ceil(0.01 * 3 * 3) clamps to at least one pixel
        assert_eq!(config.resolve_min_region_area(3, 3), 1);
        config.min_region_area = Some(42);
        assert_eq!(config.resolve_min_region_area(100, 100), 42);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[input]\ndirectory = \"/tmp/frames\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.input.directory, PathBuf::from("/tmp/frames"));

        let missing = Config::load(Path::new("/nonexistent/motiondetect.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadFile(..))));
    }
}
