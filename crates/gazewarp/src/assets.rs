//! Stimulus image lookup.

use std::path::{Path, PathBuf};

use image::RgbaImage;

#[derive(Debug)]
pub struct AssetError {
    pub stimulus: String,
    pub path: PathBuf,
    pub source: image::ImageError,
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot load image for stimulus '{}' from {}: {}",
            self.stimulus,
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Provides the background image shown for a stimulus.
pub trait AssetSource {
    fn load(&self, stimulus: &str) -> Result<RgbaImage, AssetError>;
}

/// Images stored as `<dir>/<stimulus><suffix>`.
#[derive(Debug, Clone)]
pub struct StimulusAssets {
    dir: PathBuf,
    suffix: String,
}

impl StimulusAssets {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, stimulus: &str) -> PathBuf {
        self.dir.join(format!("{}{}", stimulus, self.suffix))
    }
}

impl AssetSource for StimulusAssets {
    fn load(&self, stimulus: &str) -> Result<RgbaImage, AssetError> {
        let path = self.path_for(stimulus);
        let img = image::open(&path).map_err(|source| AssetError {
            stimulus: stimulus.to_string(),
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Loaded {} ({}x{})", path.display(), img.width(), img.height());
        Ok(img.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_joins_key_and_suffix() {
        let assets = StimulusAssets::new("/data/stimuli", ".word.png");
        assert_eq!(
            assets.path_for("reading_3"),
            PathBuf::from("/data/stimuli/reading_3.word.png")
        );
    }

    #[test]
    fn loads_png_and_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]));
        img.save(dir.path().join("s1.word.png")).unwrap();

        let assets = StimulusAssets::new(dir.path(), ".word.png");
        let loaded = assets.load("s1").unwrap();
        assert_eq!(loaded.dimensions(), (8, 4));
        assert_eq!(loaded.get_pixel(3, 2), &image::Rgba([10, 20, 30, 255]));

        let err = assets.load("s2").unwrap_err();
        assert_eq!(err.stimulus, "s2");
        assert!(err.to_string().contains("s2.word.png"));
    }
}
