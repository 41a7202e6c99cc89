//! Vello-based renderer implementation.

use crate::renderer::Renderer;
use crate::scene::{Frame, LineCap, LineJoin};
use inkboard_core::Rgba;
use kurbo::{Affine, Cap, Join, Rect, Stroke};
use peniko::{Color, Fill};
use vello::Scene;

fn to_color(rgba: Rgba) -> Color {
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}

/// Vello-based renderer for GPU-accelerated 2D graphics.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloRenderer {
    pub fn new() -> Self {
        Self { scene: Scene::new() }
    }

    /// Get the built scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, frame: &Frame<'_>) {
        self.scene.reset();

        let background = Rect::new(0.0, 0.0, frame.size.width, frame.size.height);
        self.scene.fill(
            Fill::NonZero,
            Affine::IDENTITY,
            to_color(frame.background),
            None,
            &background,
        );

        for command in &frame.commands {
            let cap = match command.cap {
                LineCap::Butt => Cap::Butt,
                LineCap::Round => Cap::Round,
            };
            let join = match command.join {
                LineJoin::Miter => Join::Miter,
                LineJoin::Round => Join::Round,
            };
            let stroke = Stroke::new(command.width).with_caps(cap).with_join(join);
            self.scene.stroke(
                &stroke,
                frame.transform,
                to_color(command.color),
                None,
                &command.path(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderContext;
    use crate::scene::render;
    use inkboard_core::{Camera, StrokeId, StrokeStyle, UserId, WhiteboardId};
    use kurbo::{Point, Size};

    #[test]
    fn test_renderer_creation() {
        let renderer = VelloRenderer::new();
        assert!(renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_scene_with_strokes() {
        let strokes = vec![
            inkboard_core::Stroke::from_parts(
                StrokeId::new(),
                WhiteboardId::new(),
                UserId::new("u"),
                vec![Point::new(100.0, 100.0), Point::new(200.0, 150.0)],
                StrokeStyle::default(),
            )
            .unwrap(),
        ];
        let ctx = RenderContext::new(Camera::new(), Size::new(800.0, 600.0));
        let mut renderer = VelloRenderer::new();
        renderer.build_scene(&render(&strokes, None, &ctx));
        assert!(!renderer.scene().encoding().is_empty());
    }
}
