//! Session configuration: display geometry, editing behaviour, asset lookup.
//!
//! Every field has a default, so a JSON config file only needs the keys it
//! overrides. CLI flags are applied on top of the loaded value.

use std::path::{Path, PathBuf};

use crate::editor::{EditorOptions, ViewTransform};
use crate::gaze::GazeColumns;

const DEFAULT_POINT_RADIUS_PX: f64 = 5.0;
const DEFAULT_SIMPLIFY_WINDOW: usize = 10;
const DEFAULT_FIXATION_CROSS: [f64; 2] = [15.0, 80.0];
const DEFAULT_IMAGE_SUFFIX: &str = ".word.png";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Window margin and image scale.
    pub view: ViewTransform,
    /// Hit-test and marker radius in window pixels.
    pub point_radius_px: f64,
    /// Only allow vertical displacement of destination points.
    pub vertical_only: bool,
    /// Number of consecutive samples averaged into one displayed trace point.
    pub simplify_window: usize,
    /// Fixation cross position in gaze pixels, drawn as a reference mark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixation_cross: Option<[f64; 2]>,
    /// Directory holding stimulus images. Defaults to `<gaze dir>/../stimuli`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stimuli_dir: Option<PathBuf>,
    /// Appended to the stimulus key to form the image file name.
    pub image_suffix: String,
    /// Gaze table column names.
    pub columns: GazeColumns,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            view: ViewTransform::default(),
            point_radius_px: DEFAULT_POINT_RADIUS_PX,
            vertical_only: false,
            simplify_window: DEFAULT_SIMPLIFY_WINDOW,
            fixation_cross: Some(DEFAULT_FIXATION_CROSS),
            stimuli_dir: None,
            image_suffix: DEFAULT_IMAGE_SUFFIX.to_string(),
            columns: GazeColumns::default(),
        }
    }
}

impl SessionConfig {
    /// Load a config from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.view.scale.is_finite() || self.view.scale <= 0.0 {
            return Err("view.scale must be finite and > 0".to_string());
        }
        if !self.view.margin_px.is_finite() || self.view.margin_px < 0.0 {
            return Err("view.margin_px must be finite and >= 0".to_string());
        }
        if !self.point_radius_px.is_finite() || self.point_radius_px <= 0.0 {
            return Err("point_radius_px must be finite and > 0".to_string());
        }
        if self.simplify_window == 0 {
            return Err("simplify_window must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            view: self.view,
            point_radius_px: self.point_radius_px,
            vertical_only: self.vertical_only,
        }
    }

    /// Stimulus image directory for a gaze file.
    pub fn stimuli_dir_for(&self, gaze_path: &Path) -> PathBuf {
        if let Some(dir) = &self.stimuli_dir {
            return dir.clone();
        }
        let gaze_dir = gaze_path.parent().unwrap_or(Path::new(""));
        match gaze_dir.parent() {
            Some(up) if !gaze_dir.as_os_str().is_empty() => up.join("stimuli"),
            _ => gaze_dir.join("..").join("stimuli"),
        }
    }
}
