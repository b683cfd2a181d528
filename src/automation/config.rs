//! Configuration types for the bot.
//!
//! Loads config.yaml (or a `.json` file) once at startup and validates it into
//! an immutable [`BotConfig`]. Missing required keys are fatal.

use anyhow::{Context, Result, anyhow};
use image::Rgb;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::automation::timing::{DelayRange, deserialize_secs};
use crate::geometry::{Point, Rect};
use crate::ocr::{NumberParse, PreprocessParams};

/// Click regions the control loop refers to by name.
pub const REQUIRED_CLICK_REGIONS: [&str; 21] = [
    "start",
    "fight",
    "select_1",
    "select_2",
    "select_3",
    "select_4",
    "select_5",
    "place_1",
    "place_2",
    "place_3",
    "place_4",
    "place_5",
    "place_6",
    "place_7",
    "place_8",
    "cancel",
    "confirm",
    "back",
    "collect",
    "collect_confirm",
    "collect_cancel",
];

pub const REQUIRED_DETECT_POINTS: [&str; 2] = ["home", "battle"];
pub const PERCENT_REGION: &str = "percent";

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Two opposite corners as written in the config file.
#[derive(Clone, Copy, Debug, Deserialize)]
struct RectSpec {
    p1: Point,
    p2: Point,
}

impl RectSpec {
    fn to_rect(self) -> Rect {
        Rect::from_two_points(self.p1, self.p2)
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawConfig {
    screen: ScreenSection,
    timing: TimingConfig,
    click_regions: BTreeMap<String, RectSpec>,
    detect_points: BTreeMap<String, Point>,
    #[serde(default)]
    detect_points_expected_color: ExpectedColors,
    #[serde(default = "default_tolerance")]
    detect_points_color_tolerance: u8,
    detect_regions: BTreeMap<String, RectSpec>,
    #[serde(default)]
    ocr: OcrConfig,
    #[serde(default)]
    run: RunSection,
}

#[derive(Clone, Debug, Deserialize)]
struct ScreenSection {
    /// Config coordinates → `cliclick` coordinates
    #[serde(default = "default_scale")]
    scale: f64,
    /// Physical display pixels per logical point (2.0 on Retina)
    #[serde(default = "default_capture_scale")]
    capture_scale: f64,
    #[serde(default)]
    random_click: RandomClick,
}

#[derive(Clone, Debug, Deserialize)]
struct RandomClick {
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_margin")]
    margin: i32,
}

impl Default for RandomClick {
    fn default() -> Self {
        Self {
            seed: None,
            margin: default_margin(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct ExpectedColors {
    #[serde(default = "default_expected_color")]
    home: [u8; 3],
    #[serde(default = "default_expected_color")]
    battle: [u8; 3],
}

impl Default for ExpectedColors {
    fn default() -> Self {
        Self {
            home: default_expected_color(),
            battle: default_expected_color(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RunSection {
    /// Stop after this many loops (unset = until ESC)
    #[serde(default)]
    max_loops: Option<u32>,
}

/// Delays and cadences. Written in seconds in the config file.
#[derive(Clone, Debug, Deserialize)]
pub struct TimingConfig {
    /// Pause after every click
    pub click_gap_range: DelayRange,
    /// Pause between screen-state polls
    pub poll_interval_range: DelayRange,
    /// Wait after the last place click
    #[serde(rename = "after_places_wait_sec", deserialize_with = "deserialize_secs")]
    pub after_places_wait: Duration,
    /// Give up waiting for the percentage after this long
    #[serde(rename = "percent_wait_timeout_sec", deserialize_with = "deserialize_secs")]
    pub percent_wait_timeout: Duration,
    /// Pause between the start and fight clicks
    pub home_start_fight_gap_range: DelayRange,
    /// Pause between loops
    #[serde(
        rename = "loop_pause_sec",
        default = "default_loop_pause",
        deserialize_with = "deserialize_secs"
    )]
    pub loop_pause: Duration,
    /// Pause after a failed loop
    #[serde(
        rename = "error_pause_sec",
        default = "default_error_pause",
        deserialize_with = "deserialize_secs"
    )]
    pub error_pause: Duration,
    /// Run the collect sequence every Nth loop
    #[serde(default = "default_collect_every")]
    pub collect_every: u32,
    /// Cancel-recovery rounds before giving up on reaching home
    #[serde(default = "default_recovery_max_attempts")]
    pub recovery_max_attempts: u32,
}

/// OCR engine location and preprocessing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OcrConfig {
    /// Tesseract binary (default: PATH, then Homebrew locations)
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
    #[serde(flatten)]
    pub preprocess: PreprocessParams,
    /// Reject percentages outside 0-100 instead of taking the first number
    #[serde(default)]
    pub clamp_percent: bool,
    /// Write the raw and preprocessed percent region to the debug directory
    #[serde(default)]
    pub save_debug_images: bool,
}

impl OcrConfig {
    pub fn number_parse(&self) -> NumberParse {
        if self.clamp_percent {
            NumberParse::ClampedPercent
        } else {
            NumberParse::FirstInteger
        }
    }
}

fn default_scale() -> f64 {
    1.0
}

fn default_capture_scale() -> f64 {
    2.0
}

fn default_margin() -> i32 {
    3
}

fn default_expected_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_tolerance() -> u8 {
    18
}

fn default_loop_pause() -> Duration {
    Duration::from_secs(5)
}

fn default_error_pause() -> Duration {
    Duration::from_secs(1)
}

fn default_collect_every() -> u32 {
    5
}

fn default_recovery_max_attempts() -> u32 {
    20
}

/// A calibration pixel and the color it shows when its state is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectPoint {
    pub point: Point,
    pub expected: Rgb<u8>,
}

/// Validated, immutable run configuration. Coordinates are already scaled
/// into `cliclick` space.
#[derive(Clone, Debug)]
pub struct BotConfig {
    pub capture_scale: f64,
    pub seed: Option<u64>,
    pub margin: i32,
    pub timing: TimingConfig,
    pub click_regions: HashMap<String, Rect>,
    pub detect_regions: HashMap<String, Rect>,
    pub home: DetectPoint,
    pub battle: DetectPoint,
    pub color_tolerance: u8,
    pub ocr: OcrConfig,
    pub max_loops: Option<u32>,
}

impl BotConfig {
    /// Parses YAML, or JSON when `json` is set, and validates it.
    pub fn parse(contents: &str, json: bool) -> Result<Self> {
        let raw: RawConfig = if json {
            serde_json::from_str(contents).context("Failed to parse JSON config")?
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let scale = raw.screen.scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(anyhow!("screen.scale must be positive, got {}", scale));
        }
        let capture_scale = raw.screen.capture_scale;
        if !(capture_scale.is_finite() && capture_scale > 0.0) {
            return Err(anyhow!(
                "screen.capture_scale must be positive, got {}",
                capture_scale
            ));
        }
        if raw.screen.random_click.margin < 0 {
            return Err(anyhow!("screen.random_click.margin must not be negative"));
        }
        validate_timing(&raw.timing)?;

        let click_regions: HashMap<String, Rect> = raw
            .click_regions
            .iter()
            .map(|(k, v)| (k.clone(), v.to_rect().scaled(scale)))
            .collect();
        let detect_regions: HashMap<String, Rect> = raw
            .detect_regions
            .iter()
            .map(|(k, v)| (k.clone(), v.to_rect().scaled(scale)))
            .collect();
        let detect_points: HashMap<String, Point> = raw
            .detect_points
            .iter()
            .map(|(k, v)| (k.clone(), v.scaled(scale)))
            .collect();

        for k in REQUIRED_CLICK_REGIONS {
            if !click_regions.contains_key(k) {
                return Err(anyhow!("Missing click_regions.{}", k));
            }
        }
        for k in REQUIRED_DETECT_POINTS {
            if !detect_points.contains_key(k) {
                return Err(anyhow!("Missing detect_points.{}", k));
            }
        }
        if !detect_regions.contains_key(PERCENT_REGION) {
            return Err(anyhow!("Missing detect_regions.{}", PERCENT_REGION));
        }

        let colors = &raw.detect_points_expected_color;
        Ok(Self {
            capture_scale,
            seed: raw.screen.random_click.seed,
            margin: raw.screen.random_click.margin,
            timing: raw.timing,
            home: DetectPoint {
                point: detect_points["home"],
                expected: Rgb(colors.home),
            },
            battle: DetectPoint {
                point: detect_points["battle"],
                expected: Rgb(colors.battle),
            },
            click_regions,
            detect_regions,
            color_tolerance: raw.detect_points_color_tolerance,
            ocr: raw.ocr,
            max_loops: raw.run.max_loops,
        })
    }

    /// The region the percentage is read from.
    pub fn percent_region(&self) -> Rect {
        self.detect_regions[PERCENT_REGION]
    }
}

fn validate_timing(t: &TimingConfig) -> Result<()> {
    if t.collect_every == 0 {
        return Err(anyhow!("timing.collect_every must be at least 1"));
    }
    if t.recovery_max_attempts == 0 {
        return Err(anyhow!("timing.recovery_max_attempts must be at least 1"));
    }
    Ok(())
}

/// Reads and validates the config file at `path`.
pub fn load_config(path: &Path) -> Result<BotConfig> {
    crate::log(&format!("Loading config from: {}", path.display()));
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    BotConfig::parse(&contents, json).with_context(|| format!("Invalid config {}", path.display()))
}

/// Picks the config file: explicit argument, else config.yaml in the working
/// directory, else config.yaml next to the executable.
pub fn resolve_config_path(arg: Option<&str>) -> PathBuf {
    if let Some(arg) = arg {
        return PathBuf::from(arg);
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    crate::paths::get_exe_dir().join(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    /// A complete config every test starts from.
    pub(crate) fn sample_yaml() -> String {
        let mut yaml = String::from(
            "screen:
  scale: 1.0
  random_click:
    seed: 42
    margin: 3
timing:
  click_gap_range: [0.1, 0.2]
  poll_interval_range: [0.5, 0.5]
  after_places_wait_sec: 3
  percent_wait_timeout_sec: 10
  home_start_fight_gap_range: [0.8, 1.2]
detect_points:
  home: [10, 10]
  battle: [20, 20]
detect_points_expected_color:
  home: [200, 40, 40]
  battle: [40, 200, 40]
detect_points_color_tolerance: 18
detect_regions:
  percent: {p1: [300, 40], p2: [360, 60]}
click_regions:
",
        );
        for (i, name) in REQUIRED_CLICK_REGIONS.iter().enumerate() {
            let x = 100 + i as i32 * 40;
            yaml.push_str(&format!(
                "  {}: {{p1: [{}, 500], p2: [{}, 530]}}\n",
                name,
                x + 30,
                x
            ));
        }
        yaml
    }

    #[test]
    fn test_parse_sample_config() {
        let config = BotConfig::parse(&sample_yaml(), false).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.margin, 3);
        assert_eq!(config.capture_scale, 2.0);
        assert_eq!(config.click_regions["start"], Rect::new(100, 500, 130, 530));
        assert_eq!(config.percent_region(), Rect::new(300, 40, 360, 60));
        assert_eq!(config.home.point, Point::new(10, 10));
        assert_eq!(config.battle.expected, Rgb([40, 200, 40]));
        assert_eq!(config.timing.collect_every, 5);
        assert_eq!(config.timing.recovery_max_attempts, 20);
        assert_eq!(config.timing.loop_pause, Duration::from_secs(5));
        assert_eq!(config.timing.after_places_wait, Duration::from_secs(3));
        assert_eq!(config.ocr.preprocess, PreprocessParams::default());
        assert_eq!(config.ocr.number_parse(), NumberParse::FirstInteger);
        assert_eq!(config.max_loops, None);
    }

    #[test]
    fn test_scale_applies_to_all_tables() {
        let yaml = sample_yaml().replace("scale: 1.0", "scale: 0.5");
        let config = BotConfig::parse(&yaml, false).unwrap();
        assert_eq!(config.click_regions["start"], Rect::new(50, 250, 65, 265));
        assert_eq!(config.percent_region(), Rect::new(150, 20, 180, 30));
        assert_eq!(config.home.point, Point::new(5, 5));
    }

    #[test]
    fn test_missing_click_region_is_fatal() {
        let yaml: String = sample_yaml()
            .lines()
            .filter(|l| !l.trim_start().starts_with("collect_cancel:"))
            .map(|l| format!("{}\n", l))
            .collect();
        let err = BotConfig::parse(&yaml, false).unwrap_err();
        assert_eq!(err.to_string(), "Missing click_regions.collect_cancel");
    }

    #[test]
    fn test_missing_detect_point_is_fatal() {
        let yaml = sample_yaml().replace("  battle: [20, 20]\n", "");
        let err = BotConfig::parse(&yaml, false).unwrap_err();
        assert_eq!(err.to_string(), "Missing detect_points.battle");
    }

    #[test]
    fn test_missing_percent_region_is_fatal() {
        let yaml = sample_yaml().replace("  percent:", "  other:");
        let err = BotConfig::parse(&yaml, false).unwrap_err();
        assert_eq!(err.to_string(), "Missing detect_regions.percent");
    }

    #[test]
    fn test_missing_timing_key_is_fatal() {
        let yaml = sample_yaml().replace("  after_places_wait_sec: 3\n", "");
        assert!(BotConfig::parse(&yaml, false).is_err());
    }

    #[test]
    fn test_unrepresentable_seconds_are_rejected() {
        let yaml = sample_yaml().replace(
            "percent_wait_timeout_sec: 10",
            "percent_wait_timeout_sec: 1.0e30",
        );
        let err = BotConfig::parse(&yaml, false).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid duration"), "{:#}", err);

        let yaml = sample_yaml().replace(
            "  home_start_fight_gap_range",
            "  error_pause_sec: -1\n  home_start_fight_gap_range",
        );
        assert!(BotConfig::parse(&yaml, false).is_err());

        let yaml = sample_yaml().replace("[0.8, 1.2]", "[0.8, 1.0e30]");
        assert!(BotConfig::parse(&yaml, false).is_err());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let yaml = sample_yaml().replace("[0.1, 0.2]", "[0.3, 0.2]");
        assert!(BotConfig::parse(&yaml, false).is_err());
    }

    #[test]
    fn test_zero_collect_cadence_is_rejected() {
        let yaml = sample_yaml().replace(
            "  home_start_fight_gap_range",
            "  collect_every: 0\n  home_start_fight_gap_range",
        );
        let err = BotConfig::parse(&yaml, false).unwrap_err();
        assert!(err.to_string().contains("collect_every"));
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let yaml = sample_yaml()
            .replace("detect_points_color_tolerance: 18\n", "")
            .replace(
                "detect_points_expected_color:\n  home: [200, 40, 40]\n  battle: [40, 200, 40]\n",
                "",
            )
            .replace("  random_click:\n    seed: 42\n    margin: 3\n", "");
        let config = BotConfig::parse(&yaml, false).unwrap();
        assert_eq!(config.color_tolerance, 18);
        assert_eq!(config.home.expected, Rgb([255, 255, 255]));
        assert_eq!(config.seed, None);
        assert_eq!(config.margin, 3);
    }

    #[test]
    fn test_ocr_and_run_sections() {
        let yaml = format!(
            "{}ocr:\n  scale: 6\n  invert: true\n  clamp_percent: true\nrun:\n  max_loops: 12\n",
            sample_yaml()
        );
        let config = BotConfig::parse(&yaml, false).unwrap();
        assert_eq!(config.ocr.preprocess.scale, 6);
        assert!(config.ocr.preprocess.invert);
        assert_eq!(config.ocr.preprocess.contrast, 1.2);
        assert_eq!(config.ocr.number_parse(), NumberParse::ClampedPercent);
        assert_eq!(config.max_loops, Some(12));
    }

    #[test]
    fn test_load_json_config() {
        let value: serde_yaml::Value = serde_yaml::from_str(&sample_yaml()).unwrap();
        let json = serde_json::to_string(&value).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, json).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.click_regions.len(), REQUIRED_CLICK_REGIONS.len());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.yaml")).is_err());
    }

    #[test]
    fn test_resolve_config_path_prefers_argument() {
        assert_eq!(
            resolve_config_path(Some("custom.yaml")),
            PathBuf::from("custom.yaml")
        );
    }
}
