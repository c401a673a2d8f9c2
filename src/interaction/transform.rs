use emath::{Pos2, Rect, Vec2, pos2, vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub rect: Rect,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            rect: Rect::from_min_size(Pos2::ZERO, vec2(width.max(1.0), height.max(1.0))),
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self { rect }
    }

    pub fn center(&self) -> Pos2 {
        self.rect.center()
    }

    pub fn contains_circle(&self, center: Pos2, radius: f32) -> bool {
        !(center.x + radius < self.rect.left()
            || center.x - radius > self.rect.right()
            || center.y + radius < self.rect.top()
            || center.y - radius > self.rect.bottom())
    }
}

/// Pan + uniform zoom applied to the whole drawing. World origin maps to the
/// viewport center when `pan` is zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub pan: Vec2,
    pub zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

impl ViewTransform {
    pub fn new(min_zoom: f32, max_zoom: f32) -> Self {
        let min_zoom = min_zoom.max(0.001);
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0_f32.clamp(min_zoom, max_zoom.max(min_zoom)),
            min_zoom,
            max_zoom: max_zoom.max(min_zoom),
        }
    }

    pub fn zoom_limits(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn world_to_screen(&self, viewport: &Viewport, world: Vec2) -> Pos2 {
        viewport.center() + self.pan + world * self.zoom
    }

    pub fn screen_to_world(&self, viewport: &Viewport, screen: Pos2) -> Vec2 {
        (screen - viewport.center() - self.pan) / self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Zooms by `factor` keeping the world point under `anchor` fixed on screen.
    pub fn zoom_at(&mut self, viewport: &Viewport, anchor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let world_before = self.screen_to_world(viewport, anchor);
        self.set_zoom(self.zoom * factor);
        self.pan = anchor - viewport.center() - (world_before * self.zoom);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Frames `bounds` (world space) inside the viewport with `padding` screen units.
    pub fn fit_to(&mut self, viewport: &Viewport, bounds: Rect, padding: f32) {
        let available = viewport.rect.size() - vec2(padding, padding) * 2.0;
        let size = bounds.size().max(vec2(1.0, 1.0));
        let zoom = (available.x / size.x).min(available.y / size.y);
        self.set_zoom(if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 });

        let center = bounds.center();
        self.pan = -vec2(center.x, center.y) * self.zoom;
    }

    pub fn world_rect_to_screen(&self, viewport: &Viewport, rect: Rect) -> Rect {
        let min = self.world_to_screen(viewport, rect.min.to_vec2());
        let max = self.world_to_screen(viewport, rect.max.to_vec2());
        Rect::from_two_pos(min, max)
    }

    pub fn visible_world_rect(&self, viewport: &Viewport) -> Rect {
        let min = self.screen_to_world(viewport, viewport.rect.min);
        let max = self.screen_to_world(viewport, viewport.rect.max);
        Rect::from_two_pos(pos2(min.x, min.y), pos2(max.x, max.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn screen_and_world_are_inverse() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut transform = ViewTransform::default();
        transform.pan_by(vec2(35.0, -12.0));
        transform.set_zoom(2.5);

        let world = vec2(-40.0, 17.0);
        let screen = transform.world_to_screen(&viewport, world);
        assert!(close(transform.screen_to_world(&viewport, screen), world));
    }

    #[test]
    fn zoom_is_clamped() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut transform = ViewTransform::new(0.1, 10.0);
        for _ in 0..100 {
            transform.zoom_at(&viewport, pos2(10.0, 10.0), 2.0);
        }
        assert_eq!(transform.zoom, 10.0);
        for _ in 0..100 {
            transform.zoom_at(&viewport, pos2(10.0, 10.0), 0.5);
        }
        assert_eq!(transform.zoom, 0.1);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut transform = ViewTransform::default();
        let anchor = pos2(620.0, 140.0);
        let before = transform.screen_to_world(&viewport, anchor);
        transform.zoom_at(&viewport, anchor, 1.7);
        assert!(close(transform.screen_to_world(&viewport, anchor), before));
    }

    #[test]
    fn fit_to_centers_bounds() {
        let viewport = Viewport::new(400.0, 400.0);
        let mut transform = ViewTransform::default();
        let bounds = Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 200.0));
        transform.fit_to(&viewport, bounds, 0.0);

        assert!((transform.zoom - 2.0).abs() < 1e-4);
        let center = transform.world_to_screen(&viewport, vec2(200.0, 150.0));
        assert!(close(center.to_vec2(), viewport.center().to_vec2()));
    }
}
