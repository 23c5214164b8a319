//! Window ↔ gaze coordinate conversion for the editor canvas.

/// Uniform scale plus a fixed margin around the stimulus image.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewTransform {
    /// Blank border around the image, in window pixels.
    pub margin_px: f64,
    /// Window pixels per gaze pixel.
    pub scale: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            margin_px: 100.0,
            scale: 0.5,
        }
    }
}

impl ViewTransform {
    pub fn new(margin_px: f64, scale: f64) -> Self {
        Self { margin_px, scale }
    }

    pub fn gaze_to_window(&self, p: [f64; 2]) -> [f64; 2] {
        [
            p[0] * self.scale + self.margin_px,
            p[1] * self.scale + self.margin_px,
        ]
    }

    pub fn window_to_gaze(&self, p: [f64; 2]) -> [f64; 2] {
        [
            (p[0] - self.margin_px) / self.scale,
            (p[1] - self.margin_px) / self.scale,
        ]
    }

    /// Window size needed to show an image of `image_size` gaze pixels.
    pub fn window_size(&self, image_size: [u32; 2]) -> [u32; 2] {
        let border = 2 * self.margin_px.round() as u32;
        let extent = |v: u32| (v as f64 * self.scale).round() as u32 + border;
        [extent(image_size[0]), extent(image_size[1])]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn window_and_gaze_frames_are_inverse() {
        let v = ViewTransform::new(100.0, 0.5);
        assert_eq!(v.gaze_to_window([0.0, 0.0]), [100.0, 100.0]);
        assert_eq!(v.window_to_gaze([150.0, 110.0]), [100.0, 20.0]);

        let p = [321.5, 77.25];
        let back = v.window_to_gaze(v.gaze_to_window(p));
        assert_relative_eq!(back[0], p[0], epsilon = 1e-12);
        assert_relative_eq!(back[1], p[1], epsilon = 1e-12);
    }

    #[test]
    fn window_size_adds_margin_on_both_sides() {
        let v = ViewTransform::new(100.0, 0.5);
        assert_eq!(v.window_size([1600, 300]), [1000, 350]);
    }
}
