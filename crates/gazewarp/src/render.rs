//! Frame rendering for the editor: stimulus image, corrected trace, markers.
//!
//! Drawing goes through the [`Surface`] trait so the same frame description
//! can target an on-screen canvas or the raster used for PNG previews.

use image::{imageops, Rgba, RgbaImage};

use crate::editor::{PointEditor, ViewTransform};

pub type Color = [u8; 4];

pub const WHITE: Color = [255, 255, 255, 255];
pub const BLACK: Color = [0, 0, 0, 255];
pub const RED: Color = [255, 0, 0, 255];
pub const BLUE: Color = [0, 0, 255, 255];
pub const LIGHT_BLUE: Color = [173, 216, 230, 255];

/// Half-length of the fixation cross arms, in window pixels.
const CROSS_HALF_LEN: f64 = 10.0;
const TRACE_WIDTH: f64 = 2.0;

/// Drawing primitives in window coordinates.
pub trait Surface {
    fn clear(&mut self, color: Color);
    fn draw_image(&mut self, origin: [f64; 2], image: &RgbaImage);
    fn draw_line(&mut self, from: [f64; 2], to: [f64; 2], color: Color, width: f64);
    fn draw_disc(&mut self, center: [f64; 2], radius: f64, fill: Color, outline: Color);
}

/// Static content of one stimulus visit.
#[derive(Debug, Clone)]
pub struct StimulusScene {
    pub title: String,
    /// Background already scaled to window pixels.
    pub image: RgbaImage,
    /// Unscaled image size in gaze pixels.
    pub image_size: [u32; 2],
    /// Simplified uncorrected trace in gaze pixels.
    pub trace: Vec<Option<[f64; 2]>>,
    pub fixation_cross: Option<[f64; 2]>,
}

impl StimulusScene {
    pub fn new(
        title: impl Into<String>,
        image: &RgbaImage,
        view: &ViewTransform,
        trace: Vec<Option<[f64; 2]>>,
        fixation_cross: Option<[f64; 2]>,
    ) -> Self {
        let (w, h) = image.dimensions();
        let sw = ((w as f64 * view.scale).round() as u32).max(1);
        let sh = ((h as f64 * view.scale).round() as u32).max(1);
        let scaled = if (sw, sh) == (w, h) {
            image.clone()
        } else {
            imageops::resize(image, sw, sh, imageops::FilterType::Triangle)
        };
        Self {
            title: title.into(),
            image: scaled,
            image_size: [w, h],
            trace,
            fixation_cross,
        }
    }

    pub fn window_size(&self, view: &ViewTransform) -> [u32; 2] {
        view.window_size(self.image_size)
    }
}

/// Draw the full frame for the editor's current state.
pub fn draw_frame(surface: &mut dyn Surface, editor: &PointEditor, scene: &StimulusScene) {
    let options = editor.options();
    let view = options.view;
    let radius = options.point_radius_px;

    surface.clear(WHITE);
    surface.draw_image(view.gaze_to_window([0.0, 0.0]), &scene.image);

    if let Some(cross) = scene.fixation_cross {
        let [x, y] = view.gaze_to_window(cross);
        surface.draw_line([x - CROSS_HALF_LEN, y], [x + CROSS_HALF_LEN, y], RED, 2.0);
        surface.draw_line([x, y - CROSS_HALF_LEN], [x, y + CROSS_HALF_LEN], RED, 2.0);
    }

    let corrected = editor.preview_mapper().apply(&scene.trace);
    for seg in corrected.windows(2) {
        if let [Some(a), Some(b)] = seg {
            surface.draw_line(view.gaze_to_window(*a), view.gaze_to_window(*b), BLACK, TRACE_WIDTH);
        }
    }

    for (i, pair) in editor.pairs().iter().enumerate() {
        let src = view.gaze_to_window(pair.source);
        let dst = view.gaze_to_window(pair.destination);
        surface.draw_disc(src, radius, LIGHT_BLUE, LIGHT_BLUE);
        surface.draw_line(src, dst, LIGHT_BLUE, 1.0);
        let fill = if editor.is_active(i) { RED } else { BLUE };
        surface.draw_disc(dst, radius, fill, BLACK);
    }
}

// ── Raster backend ───────────────────────────────────────────────────────

/// In-memory RGBA canvas backed by `imageproc` drawing routines.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
}

impl RasterCanvas {
    pub fn new(size: [u32; 2]) -> Self {
        Self {
            image: RgbaImage::from_pixel(size[0], size[1], Rgba(WHITE)),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl Surface for RasterCanvas {
    fn clear(&mut self, color: Color) {
        for px in self.image.pixels_mut() {
            *px = Rgba(color);
        }
    }

    fn draw_image(&mut self, origin: [f64; 2], image: &RgbaImage) {
        imageops::overlay(
            &mut self.image,
            image,
            origin[0].round() as i64,
            origin[1].round() as i64,
        );
    }

    fn draw_line(&mut self, from: [f64; 2], to: [f64; 2], color: Color, width: f64) {
        let dx = to[0] - from[0];
        let dy = to[1] - from[1];
        let len = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if len > 0.0 { (-dy / len, dx / len) } else { (0.0, 0.0) };
        // Thick lines are drawn as parallel one-pixel strokes.
        let strokes = width.round().max(1.0) as usize;
        for k in 0..strokes {
            let off = k as f64 - (strokes - 1) as f64 / 2.0;
            imageproc::drawing::draw_line_segment_mut(
                &mut self.image,
                ((from[0] + nx * off) as f32, (from[1] + ny * off) as f32),
                ((to[0] + nx * off) as f32, (to[1] + ny * off) as f32),
                Rgba(color),
            );
        }
    }

    fn draw_disc(&mut self, center: [f64; 2], radius: f64, fill: Color, outline: Color) {
        let c = (center[0].round() as i32, center[1].round() as i32);
        let r = radius.round() as i32;
        imageproc::drawing::draw_filled_circle_mut(&mut self.image, c, r, Rgba(fill));
        imageproc::drawing::draw_hollow_circle_mut(&mut self.image, c, r, Rgba(outline));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::Correspondences;
    use crate::editor::{EditorOptions, InputEvent};

    #[derive(Debug, Default)]
    struct Recorder {
        lines: Vec<([f64; 2], [f64; 2], Color)>,
        discs: Vec<([f64; 2], Color)>,
        images: usize,
    }

    impl Surface for Recorder {
        fn clear(&mut self, _color: Color) {}
        fn draw_image(&mut self, _origin: [f64; 2], _image: &RgbaImage) {
            self.images += 1;
        }
        fn draw_line(&mut self, from: [f64; 2], to: [f64; 2], color: Color, _width: f64) {
            self.lines.push((from, to, color));
        }
        fn draw_disc(&mut self, center: [f64; 2], _radius: f64, fill: Color, _outline: Color) {
            self.discs.push((center, fill));
        }
    }

    fn options() -> EditorOptions {
        EditorOptions {
            view: ViewTransform::new(10.0, 1.0),
            ..EditorOptions::default()
        }
    }

    fn scene(trace: Vec<Option<[f64; 2]>>) -> StimulusScene {
        let img = RgbaImage::from_pixel(40, 20, Rgba(BLACK));
        StimulusScene::new("s", &img, &options().view, trace, Some([5.0, 5.0]))
    }

    #[test]
    fn scene_scales_background_and_keeps_original_size() {
        let img = RgbaImage::new(200, 100);
        let s = StimulusScene::new("s", &img, &ViewTransform::new(100.0, 0.5), vec![], None);
        assert_eq!(s.image.dimensions(), (100, 50));
        assert_eq!(s.image_size, [200, 100]);
        assert_eq!(s.window_size(&ViewTransform::new(100.0, 0.5)), [300, 250]);
    }

    #[test]
    fn frame_draws_cross_trace_and_markers() {
        let editor = PointEditor::new(Correspondences::image_anchors(40.0, 20.0), options());
        let trace = vec![
            Some([1.0, 1.0]),
            Some([2.0, 2.0]),
            None,
            Some([4.0, 4.0]),
            Some([5.0, 5.0]),
        ];
        let mut rec = Recorder::default();
        draw_frame(&mut rec, &editor, &scene(trace));

        assert_eq!(rec.images, 1);
        let red_lines = rec.lines.iter().filter(|l| l.2 == RED).count();
        let black_lines = rec.lines.iter().filter(|l| l.2 == BLACK).count();
        let blue_lines = rec.lines.iter().filter(|l| l.2 == LIGHT_BLUE).count();
        assert_eq!(red_lines, 2);
        // Segments touching the missing sample are skipped.
        assert_eq!(black_lines, 2);
        assert_eq!(blue_lines, 6);
        assert_eq!(rec.discs.len(), 12);
        assert!(rec.discs.iter().all(|d| d.1 != RED));
    }

    #[test]
    fn hovered_destination_is_highlighted() {
        let mut editor = PointEditor::new(Correspondences::image_anchors(40.0, 20.0), options());
        editor.handle(InputEvent::PointerMove([10.0, 10.0]));
        let mut rec = Recorder::default();
        draw_frame(&mut rec, &editor, &scene(vec![]));
        assert_eq!(rec.discs[1], ([10.0, 10.0], RED));
        assert_eq!(rec.discs[3].1, BLUE);
    }

    #[test]
    fn raster_canvas_draws_pixels() {
        let mut canvas = RasterCanvas::new([30, 30]);
        canvas.draw_disc([15.0, 15.0], 4.0, BLUE, BLACK);
        canvas.draw_line([0.0, 2.0], [29.0, 2.0], RED, 2.0);
        let img = canvas.into_image();
        assert_eq!(img.get_pixel(15, 15), &Rgba(BLUE));
        assert!((1..=3).any(|y| img.get_pixel(10, y) == &Rgba(RED)));
        assert_eq!(img.get_pixel(0, 29), &Rgba(WHITE));
    }
}
