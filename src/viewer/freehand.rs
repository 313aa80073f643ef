use image::{Rgba, RgbaImage};

use crate::core::config::ViewerSettings;
use crate::viewer::transform::Rotation;

pub const INK: Rgba<u8> = Rgba([220, 38, 38, 255]);
const BLANK: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub source: PointerSource,
    pub client_x: f64,
    pub client_y: f64,
}

/// Bounding box of the layer as rendered, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// The layer consumed the event.
    Captured,
    /// Drawing is off; the event belongs to the layers underneath.
    PassThrough,
}

/// Ink layer with a fixed-resolution pixel buffer. Pointer positions are
/// mapped into it from whatever box the layer occupies on screen.
pub struct FreehandSurface {
    canvas: RgbaImage,
    stroke_width: u32,
    drawing: bool,
    visible: bool,
    last_point: Option<(f64, f64)>,
    strokes: usize,
}

impl FreehandSurface {
    pub fn new(width: u32, height: u32, stroke_width: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, BLANK),
            stroke_width: stroke_width.max(1),
            drawing: false,
            visible: true,
            last_point: None,
            strokes: 0,
        }
    }

    pub fn from_settings(settings: &ViewerSettings) -> Self {
        Self::new(settings.surface_width, settings.surface_height, settings.stroke_width)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes
    }

    pub fn set_drawing(&mut self, drawing: bool) {
        self.drawing = drawing;
        self.last_point = None;
    }

    pub fn toggle_drawing(&mut self) -> bool {
        self.set_drawing(!self.drawing);
        self.drawing
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        if !self.visible {
            self.last_point = None;
        }
        self.visible
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.canvas.get_pixel_checked(x, y).copied()
    }

    pub fn inked_pixels(&self) -> usize {
        self.canvas.pixels().filter(|pixel| **pixel != BLANK).count()
    }

    pub fn is_blank(&self) -> bool {
        self.inked_pixels() == 0
    }

    pub fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = BLANK;
        }
        self.last_point = None;
        self.strokes = 0;
    }

    /// Surface coordinates for a screen position, or `None` when the layer
    /// has no on-screen area.
    pub fn to_surface(
        &self,
        client_x: f64,
        client_y: f64,
        screen: &ScreenBox,
        rotation: Rotation,
    ) -> Option<(f64, f64)> {
        if screen.width <= 0.0 || screen.height <= 0.0 {
            return None;
        }
        let u = (client_x - screen.left) / screen.width;
        let v = (client_y - screen.top) / screen.height;
        let (u, v) = rotation.unrotate_unit(u, v);
        let (width, height) = self.canvas.dimensions();
        Some((u * f64::from(width), v * f64::from(height)))
    }

    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        screen: &ScreenBox,
        rotation: Rotation,
    ) -> PointerOutcome {
        if !self.drawing || !self.visible {
            return PointerOutcome::PassThrough;
        }

        match event.kind {
            PointerKind::Down => {
                if let Some(point) = self.surface_point(&event, screen, rotation) {
                    // a stroke starting off the surface still anchors later moves
                    if let Some(((x, y), _)) = self.clip(point, point) {
                        self.stamp(x.floor() as i64, y.floor() as i64);
                    }
                    self.last_point = Some(point);
                    self.strokes += 1;
                }
            }
            PointerKind::Move => {
                if let (Some(from), Some(to)) =
                    (self.last_point, self.surface_point(&event, screen, rotation))
                {
                    if let Some((start, end)) = self.clip(from, to) {
                        self.line(start, end);
                    }
                    self.last_point = Some(to);
                }
            }
            PointerKind::Up | PointerKind::Cancel => self.last_point = None,
        }
        PointerOutcome::Captured
    }

    fn surface_point(
        &self,
        event: &PointerEvent,
        screen: &ScreenBox,
        rotation: Rotation,
    ) -> Option<(f64, f64)> {
        self.to_surface(event.client_x, event.client_y, screen, rotation)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }

    /// Liang-Barsky clip of a segment to the canvas grown by one stroke width.
    fn clip(&self, from: (f64, f64), to: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
        let (width, height) = self.canvas.dimensions();
        let margin = f64::from(self.stroke_width);
        let (min_x, min_y) = (-margin, -margin);
        let (max_x, max_y) = (f64::from(width) + margin, f64::from(height) + margin);

        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let edges = [
            (-dx, from.0 - min_x),
            (dx, max_x - from.0),
            (-dy, from.1 - min_y),
            (dy, max_y - from.1),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }

        let at = |t: f64| (from.0 + t * dx, from.1 + t * dy);
        Some((at(t0), at(t1)))
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64)) {
        let (mut x0, mut y0) = (from.0.floor() as i64, from.1.floor() as i64);
        let (x1, y1) = (to.0.floor() as i64, to.1.floor() as i64);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.stamp(x0, y0);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            }
            if e2 < dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn stamp(&mut self, x: i64, y: i64) {
        let width = i64::from(self.stroke_width);
        let (canvas_w, canvas_h) = self.canvas.dimensions();
        for oy in -(width - 1) / 2..=width / 2 {
            for ox in -(width - 1) / 2..=width / 2 {
                let (px, py) = (x + ox, y + oy);
                if px >= 0 && py >= 0 && px < i64::from(canvas_w) && py < i64::from(canvas_h) {
                    self.canvas.put_pixel(px as u32, py as u32, INK);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(kind: PointerKind, x: f64, y: f64) -> PointerEvent {
        PointerEvent { kind, source: PointerSource::Mouse, client_x: x, client_y: y }
    }

    #[test]
    fn pointer_events_pass_through_unless_drawing() {
        let mut surface = FreehandSurface::new(100, 100, 1);
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 100.0, height: 100.0 };

        let outcome = surface.handle_pointer(pointer(PointerKind::Down, 10.0, 10.0), &screen, Rotation::Deg0);

        assert_eq!(outcome, PointerOutcome::PassThrough);
        assert!(surface.is_blank());
    }

    #[test]
    fn screen_points_scale_to_surface_resolution() {
        let surface = FreehandSurface::new(1000, 1414, 3);
        // surface rendered at half size after zooming out
        let screen = ScreenBox { left: 40.0, top: 20.0, width: 500.0, height: 707.0 };

        let (x, y) = surface.to_surface(290.0, 373.5, &screen, Rotation::Deg0).unwrap();

        assert!((x - 500.0).abs() < 1e-9);
        assert!((y - 707.0).abs() < 1e-9);
    }

    #[test]
    fn rotated_layer_maps_back_to_unrotated_surface() {
        let surface = FreehandSurface::new(200, 100, 1);
        // quarter turn: on screen the box is 100 wide and 200 tall
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 100.0, height: 200.0 };

        // top-right of the screen box is the surface origin after a clockwise turn
        let (x, y) = surface.to_surface(100.0, 0.0, &screen, Rotation::Deg90).unwrap();

        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);
        assert_eq!(surface.to_surface(0.0, 0.0, &ScreenBox { width: 0.0, ..screen }, Rotation::Deg0), None);
    }

    #[test]
    fn drag_draws_connected_segment_in_ink() {
        let mut surface = FreehandSurface::new(50, 50, 1);
        surface.set_drawing(true);
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 50.0, height: 50.0 };

        surface.handle_pointer(pointer(PointerKind::Down, 5.0, 5.0), &screen, Rotation::Deg0);
        surface.handle_pointer(pointer(PointerKind::Move, 15.0, 5.0), &screen, Rotation::Deg0);
        let outcome = surface.handle_pointer(pointer(PointerKind::Up, 15.0, 5.0), &screen, Rotation::Deg0);

        assert_eq!(outcome, PointerOutcome::Captured);
        assert!((5..=15).all(|x| surface.pixel(x, 5) == Some(INK)));
        assert_eq!(surface.inked_pixels(), 11);
        assert_eq!(surface.stroke_count(), 1);
    }

    #[test]
    fn move_without_down_draws_nothing() {
        let mut surface = FreehandSurface::new(50, 50, 3);
        surface.set_drawing(true);
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 50.0, height: 50.0 };

        surface.handle_pointer(pointer(PointerKind::Move, 15.0, 5.0), &screen, Rotation::Deg0);

        assert!(surface.is_blank());
    }

    #[test]
    fn touch_strokes_use_stroke_width_and_clear_wipes_them() {
        let mut surface = FreehandSurface::new(50, 50, 3);
        surface.set_drawing(true);
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 50.0, height: 50.0 };
        let touch = PointerEvent {
            kind: PointerKind::Down,
            source: PointerSource::Touch,
            client_x: 20.0,
            client_y: 20.0,
        };

        surface.handle_pointer(touch, &screen, Rotation::Deg0);
        assert_eq!(surface.inked_pixels(), 9);

        surface.clear();
        assert!(surface.is_blank());
        assert_eq!(surface.stroke_count(), 0);
        assert_eq!(surface.dimensions(), (50, 50));
    }

    #[test]
    fn moves_far_off_the_surface_are_clipped() {
        let mut surface = FreehandSurface::new(50, 50, 1);
        surface.set_drawing(true);
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 50.0, height: 50.0 };

        surface.handle_pointer(pointer(PointerKind::Down, 5.0, 5.0), &screen, Rotation::Deg0);
        surface.handle_pointer(pointer(PointerKind::Move, 1e10, 5.0), &screen, Rotation::Deg0);
        surface.handle_pointer(pointer(PointerKind::Move, 1e10, -1e12), &screen, Rotation::Deg0);

        assert!((5..50).all(|x| surface.pixel(x, 5) == Some(INK)));
        assert_eq!(surface.inked_pixels(), 45);
    }

    #[test]
    fn stroke_entering_from_off_surface_draws_the_visible_part() {
        let mut surface = FreehandSurface::new(50, 50, 1);
        surface.set_drawing(true);
        let screen = ScreenBox { left: 0.0, top: 0.0, width: 50.0, height: 50.0 };

        surface.handle_pointer(pointer(PointerKind::Down, -1e9, 20.0), &screen, Rotation::Deg0);
        surface.handle_pointer(pointer(PointerKind::Move, 10.0, 20.0), &screen, Rotation::Deg0);

        assert!((0..=10).all(|x| surface.pixel(x, 20) == Some(INK)));
        assert_eq!(surface.inked_pixels(), 11);
    }
}
