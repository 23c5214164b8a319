//! Event sources and frame sinks for the correction session.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use crate::editor::{InputEvent, ParseEventError, PointEditor};
use crate::render::{draw_frame, RasterCanvas, StimulusScene};

#[derive(Debug)]
pub enum FrontendError {
    Io(io::Error),
    Event { line: usize, source: ParseEventError },
    Preview { path: PathBuf, source: image::ImageError },
}

impl std::fmt::Display for FrontendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "event input: {}", e),
            Self::Event { line, source } => write!(f, "line {}: {}", line, source),
            Self::Preview { path, source } => {
                write!(f, "cannot write preview {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for FrontendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Event { source, .. } => Some(source),
            Self::Preview { source, .. } => Some(source),
        }
    }
}

/// Input and display side of an editing session.
///
/// `next_event` returning `Ok(None)` means the operator is gone; the session
/// treats it as an exit.
pub trait Frontend {
    fn next_event(&mut self) -> Result<Option<InputEvent>, FrontendError>;
    fn present(&mut self, editor: &PointEditor, scene: &StimulusScene) -> Result<(), FrontendError>;
}

/// Reads events from a line-oriented script and optionally writes every
/// presented frame as a PNG.
pub struct ScriptFrontend<R> {
    lines: io::Lines<R>,
    line_no: usize,
    preview_dir: Option<PathBuf>,
    frames: usize,
}

impl<R: BufRead> ScriptFrontend<R> {
    /// Script reader without previews; blank lines and `#` comments are skipped.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            preview_dir: None,
            frames: 0,
        }
    }

    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = Some(dir.into());
        self
    }

    /// Frames presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn write_preview(
        &self,
        dir: &Path,
        editor: &PointEditor,
        scene: &StimulusScene,
    ) -> Result<(), FrontendError> {
        let mut canvas = RasterCanvas::new(scene.window_size(&editor.options().view));
        draw_frame(&mut canvas, editor, scene);
        let path = dir.join(format!("{:05}_{}.png", self.frames, file_stem(&scene.title)));
        canvas
            .image()
            .save(&path)
            .map_err(|source| FrontendError::Preview { path, source })
    }
}

impl<R: BufRead> Frontend for ScriptFrontend<R> {
    fn next_event(&mut self) -> Result<Option<InputEvent>, FrontendError> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(FrontendError::Io)?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return trimmed
                .parse()
                .map(Some)
                .map_err(|source| FrontendError::Event {
                    line: self.line_no,
                    source,
                });
        }
        Ok(None)
    }

    fn present(
        &mut self,
        editor: &PointEditor,
        scene: &StimulusScene,
    ) -> Result<(), FrontendError> {
        if let Some(dir) = &self.preview_dir {
            self.write_preview(dir, editor, scene)?;
        }
        self.frames += 1;
        Ok(())
    }
}

fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::Correspondences;
    use crate::editor::{Direction, EditorOptions, ViewTransform};
    use image::RgbaImage;

    #[test]
    fn skips_blank_lines_and_comments() {
        let script = "# warm-up\n\nmove 1 2\n   \n  # note\nnext\n";
        let mut fe = ScriptFrontend::new(script.as_bytes());
        assert_eq!(fe.next_event().unwrap(), Some(InputEvent::PointerMove([1.0, 2.0])));
        assert_eq!(
            fe.next_event().unwrap(),
            Some(InputEvent::Navigate(Direction::Next))
        );
        assert_eq!(fe.next_event().unwrap(), None);
    }

    #[test]
    fn parse_errors_carry_line_number() {
        let mut fe = ScriptFrontend::new("undo\n\nhop 1 1\n".as_bytes());
        fe.next_event().unwrap();
        match fe.next_event() {
            Err(FrontendError::Event { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn presented_frames_are_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut fe = ScriptFrontend::new(io::empty()).with_preview_dir(dir.path());
        let options = EditorOptions {
            view: ViewTransform::new(5.0, 0.5),
            ..EditorOptions::default()
        };
        let editor = PointEditor::new(Correspondences::image_anchors(40.0, 20.0), options);
        let img = RgbaImage::new(40, 20);
        let scene = StimulusScene::new("p1/story 2", &img, &options.view, vec![], None);

        fe.present(&editor, &scene).unwrap();
        fe.present(&editor, &scene).unwrap();
        assert_eq!(fe.frames(), 2);

        let frame = image::open(dir.path().join("00001_p1_story_2.png")).unwrap();
        assert_eq!((frame.width(), frame.height()), (30, 20));
    }
}
