//! Offscreen rendering of scenes into RGB frames, label overlay, and the
//! video sink that frames are streamed into while recording.

mod font;
pub mod video;

pub use font::{draw_text, GLYPH_HEIGHT, GLYPH_WIDTH};
pub use video::{FfmpegWriter, VideoSink};

use crate::env::{EntityKind, Scene};

/// Side length of recorded frames, in pixels.
pub const FRAME_SIZE: usize = 700;

/// Agent labels are drawn in blue, landmark labels in red.
const AGENT_LABEL: [u8; 3] = [0, 0, 255];
const LANDMARK_LABEL: [u8; 3] = [255, 0, 0];

/// A packed rgb24 image.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: usize, height: usize, fill: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            pixels.extend_from_slice(&fill);
        }
        RgbFrame {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    /// Set a pixel; coordinates outside the frame are ignored.
    pub fn put(&mut self, x: i64, y: i64, color: [u8; 3]) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        self.pixels[i..i + 3].copy_from_slice(&color);
    }

    pub fn fill_circle(&mut self, cx: i64, cy: i64, radius: i64, color: [u8; 3]) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }
}

/// Maps world coordinates in `[-range, range]` onto frame pixels.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub width: usize,
    pub height: usize,
    pub range: f64,
}

impl Camera {
    pub fn new(width: usize, height: usize) -> Self {
        Camera {
            width,
            height,
            range: 1.0,
        }
    }

    /// Pixel position of a world point; y grows downwards in the image.
    pub fn to_pixel(&self, pos: [f64; 2]) -> (i64, i64) {
        let x = (pos[0] + self.range) / (2.0 * self.range) * self.width as f64;
        let y = (self.range - pos[1]) / (2.0 * self.range) * self.height as f64;
        (x.round() as i64, y.round() as i64)
    }

    pub fn to_pixels(&self, length: f64) -> i64 {
        (length / (2.0 * self.range) * self.width as f64).round() as i64
    }
}

/// Draw every entity as a filled disc on a white background.
pub fn rasterize(scene: &Scene, camera: &Camera) -> RgbFrame {
    let mut frame = RgbFrame::new(camera.width, camera.height, [255, 255, 255]);
    for entity in &scene.entities {
        let (x, y) = camera.to_pixel(entity.position);
        frame.fill_circle(x, y, camera.to_pixels(entity.size).max(1), entity.color);
    }
    frame
}

/// Write each entity's label next to it. Landmark labels are nudged off the
/// disc so they stay readable under the agents.
pub fn overlay_labels(frame: &mut RgbFrame, scene: &Scene, camera: &Camera) {
    for entity in &scene.entities {
        let (x, y) = camera.to_pixel(entity.position);
        let (color, offset) = match entity.kind {
            EntityKind::Agent => (AGENT_LABEL, (0, 0)),
            EntityKind::Landmark => (LANDMARK_LABEL, (10, 10)),
        };
        draw_text(frame, x + offset.0, y + offset.1, &entity.label(), color, 2);
    }
}

/// Rasterise and label a scene, ready for the video sink.
pub fn render_frame(scene: &Scene, camera: &Camera) -> RgbFrame {
    let mut frame = rasterize(scene, camera);
    overlay_labels(&mut frame, scene, camera);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Entity;

    fn scene() -> Scene {
        Scene {
            entities: vec![
                Entity {
                    kind: EntityKind::Landmark,
                    index: 0,
                    position: [0.5, 0.5],
                    size: 0.05,
                    color: [64, 64, 64],
                },
                Entity {
                    kind: EntityKind::Agent,
                    index: 0,
                    position: [-0.5, -0.5],
                    size: 0.15,
                    color: [89, 89, 217],
                },
            ],
        }
    }

    #[test]
    fn test_camera_maps_corners() {
        let cam = Camera::new(100, 100);
        assert_eq!(cam.to_pixel([-1.0, 1.0]), (0, 0));
        assert_eq!(cam.to_pixel([1.0, -1.0]), (100, 100));
        assert_eq!(cam.to_pixel([0.0, 0.0]), (50, 50));
    }

    #[test]
    fn test_rasterize_draws_entities() {
        let cam = Camera::new(100, 100);
        let frame = rasterize(&scene(), &cam);
        assert_eq!(frame.as_bytes().len(), 100 * 100 * 3);
        assert_eq!(frame.get(25, 75), Some([89, 89, 217]));
        assert_eq!(frame.get(75, 25), Some([64, 64, 64]));
        assert_eq!(frame.get(0, 0), Some([255, 255, 255]));
    }

    #[test]
    fn test_labels_use_kind_colors() {
        let cam = Camera::new(FRAME_SIZE, FRAME_SIZE);
        let frame = render_frame(&scene(), &cam);
        let pixels: Vec<[u8; 3]> = (0..frame.height())
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .filter_map(|(x, y)| frame.get(x, y))
            .collect();
        assert!(pixels.contains(&AGENT_LABEL));
        assert!(pixels.contains(&LANDMARK_LABEL));
    }

    #[test]
    fn test_put_ignores_out_of_bounds() {
        let mut frame = RgbFrame::new(2, 2, [0, 0, 0]);
        frame.put(-1, 0, [1, 1, 1]);
        frame.put(5, 5, [1, 1, 1]);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }
}
