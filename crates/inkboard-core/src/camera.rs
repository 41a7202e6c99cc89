//! View transform between the drawing surface and the canvas.
//!
//! Strokes are stored in canvas space. The surface (the element the user
//! draws on) sees them through a pan offset and a uniform zoom:
//! `surface = canvas * zoom + offset`.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// One canvas unit per surface pixel.
pub const BASE_ZOOM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Pan, in surface pixels.
    pub offset: Vec2,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: BASE_ZOOM,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera with custom zoom limits, starting at the base zoom (clamped).
    ///
    /// Inverted limits are swapped. Limits that are not positive and finite
    /// fall back to the defaults.
    pub fn with_limits(min_zoom: f64, max_zoom: f64) -> Self {
        let defaults = Self::default();
        let usable = |z: f64| z.is_finite() && z > 0.0;
        let (min_zoom, max_zoom) = if !usable(min_zoom) || !usable(max_zoom) {
            log::warn!("Ignoring zoom limits {}..{}", min_zoom, max_zoom);
            (defaults.min_zoom, defaults.max_zoom)
        } else if min_zoom > max_zoom {
            (max_zoom, min_zoom)
        } else {
            (min_zoom, max_zoom)
        };
        let mut camera = Self {
            min_zoom,
            max_zoom,
            ..defaults
        };
        camera.zoom = camera.clamp_zoom(BASE_ZOOM);
        camera
    }

    /// Clamp without panicking on limits set by hand.
    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.min(self.max_zoom).max(self.min_zoom)
    }

    /// Canvas to surface.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Surface to canvas.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn surface_to_canvas(&self, surface: Point) -> Point {
        self.inverse_transform() * surface
    }

    pub fn canvas_to_surface(&self, canvas: Point) -> Point {
        self.transform() * canvas
    }

    /// Map a client-space pointer position to canvas space, given the
    /// drawing surface's client-space origin:
    /// `((client - origin) - offset) / zoom`.
    pub fn client_to_canvas(&self, client: Point, origin: Point) -> Point {
        self.surface_to_canvas(Point::new(client.x - origin.x, client.y - origin.y))
    }

    /// The canvas region covered by a surface of `size`.
    pub fn visible_canvas(&self, size: Size) -> Rect {
        Rect::from_points(
            self.surface_to_canvas(Point::ZERO),
            self.surface_to_canvas(Point::new(size.width, size.height)),
        )
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Scale the zoom by `factor`, keeping the canvas point under
    /// `anchor` (a surface point) in place.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let zoom = self.clamp_zoom(self.zoom * factor);
        if (zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let pinned = self.surface_to_canvas(anchor);
        self.zoom = zoom;
        self.offset = anchor.to_vec2() - pinned.to_vec2() * zoom;
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = self.clamp_zoom(BASE_ZOOM);
    }

    /// Center `bounds` on a surface of `size`, zoomed to fit inside
    /// `padding` on every side. An empty or degenerate region resets.
    pub fn fit_to_bounds(&mut self, bounds: Rect, size: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let room_w = (size.width - padding * 2.0).max(1.0);
        let room_h = (size.height - padding * 2.0).max(1.0);
        self.zoom = self.clamp_zoom((room_w / bounds.width()).min(room_h / bounds.height()));

        let surface_center = Vec2::new(size.width / 2.0, size.height / 2.0);
        self.offset = surface_center - bounds.center().to_vec2() * self.zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: Point, b: Point) {
        assert!((a - b).hypot() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_client_to_canvas_subtracts_origin_then_pan_then_zoom() {
        let camera = Camera {
            offset: Vec2::new(20.0, -10.0),
            zoom: 2.0,
            ..Camera::default()
        };
        let p = camera.client_to_canvas(Point::new(150.0, 90.0), Point::new(30.0, 40.0));
        assert_near(p, Point::new(50.0, 30.0));
    }

    #[test]
    fn test_identity_view_maps_surface_to_canvas_unchanged() {
        let camera = Camera::new();
        assert_near(camera.surface_to_canvas(Point::new(12.5, 7.0)), Point::new(12.5, 7.0));
    }

    #[test]
    fn test_canvas_surface_inverse() {
        let camera = Camera {
            offset: Vec2::new(30.0, -20.0),
            zoom: 1.5,
            ..Camera::default()
        };
        let point = Point::new(123.0, 456.0);
        assert_near(camera.canvas_to_surface(camera.surface_to_canvas(point)), point);
    }

    #[test]
    fn test_zoom_keeps_anchor_pinned() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(40.0, 10.0));
        let anchor = Point::new(200.0, 150.0);
        let before = camera.surface_to_canvas(anchor);

        camera.zoom_at(anchor, 1.1);
        assert!((camera.zoom - 1.1).abs() < 1e-12);
        assert_near(camera.surface_to_canvas(anchor), before);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::with_limits(0.5, 4.0);
        camera.zoom_at(Point::ZERO, 0.001);
        assert_eq!(camera.zoom, 0.5);
        camera.zoom_at(Point::ZERO, 1000.0);
        assert_eq!(camera.zoom, 4.0);
    }

    #[test]
    fn test_visible_canvas_follows_pan_and_zoom() {
        let camera = Camera {
            offset: Vec2::new(-100.0, -50.0),
            zoom: 2.0,
            ..Camera::default()
        };
        let visible = camera.visible_canvas(Size::new(400.0, 200.0));
        assert_eq!(visible, Rect::new(50.0, 25.0, 250.0, 125.0));
    }

    #[test]
    fn test_fit_to_bounds_centers_content() {
        let mut camera = Camera::new();
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        camera.fit_to_bounds(bounds, Size::new(400.0, 400.0), 0.0);

        assert!((camera.zoom - 4.0).abs() < 1e-10);
        assert_near(camera.canvas_to_surface(bounds.center()), Point::new(200.0, 200.0));
    }

    #[test]
    fn test_fit_to_degenerate_bounds_resets() {
        let mut camera = Camera {
            offset: Vec2::new(5.0, 5.0),
            zoom: 3.0,
            ..Camera::default()
        };
        camera.fit_to_bounds(Rect::new(1.0, 1.0, 1.0, 9.0), Size::new(100.0, 100.0), 10.0);
        assert_eq!(camera.offset, Vec2::ZERO);
        assert_eq!(camera.zoom, BASE_ZOOM);
    }

    #[test]
    fn test_inverted_limits_are_swapped() {
        let mut camera = Camera::with_limits(5.0, 1.0);
        assert_eq!((camera.min_zoom, camera.max_zoom), (1.0, 5.0));
        assert_eq!(camera.zoom, 1.0);
        camera.zoom_at(Point::ZERO, 100.0);
        assert_eq!(camera.zoom, 5.0);
    }

    #[test]
    fn test_unusable_limits_fall_back_to_defaults() {
        let defaults = Camera::default();
        for (min, max) in [(f64::NAN, 2.0), (0.5, f64::INFINITY), (0.0, 2.0), (-1.0, 2.0)] {
            let camera = Camera::with_limits(min, max);
            assert_eq!((camera.min_zoom, camera.max_zoom), (defaults.min_zoom, defaults.max_zoom));
            assert_eq!(camera.zoom, BASE_ZOOM);
        }
    }

    #[test]
    fn test_hand_set_inverted_limits_do_not_panic() {
        let mut camera = Camera {
            min_zoom: 4.0,
            max_zoom: 2.0,
            ..Camera::default()
        };
        camera.zoom_at(Point::ZERO, 1.5);
        camera.reset();
        assert!(camera.zoom.is_finite());
    }
}
