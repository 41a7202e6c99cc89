//! Pure frame construction: strokes in, draw commands out.
//!
//! Nothing here touches a backend, so the output can be inspected directly
//! in tests and reused by every renderer.

use crate::renderer::RenderContext;
use inkboard_core::{OpenStroke, Rgba, Stroke};
use kurbo::{Affine, BezPath, Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
}

/// One polyline to stroke, in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand<'a> {
    pub points: &'a [Point],
    pub color: Rgba,
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    /// The local stroke still being captured.
    pub in_progress: bool,
}

impl DrawCommand<'_> {
    pub fn path(&self) -> BezPath {
        stroke_path(self.points)
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Canvas to device transform.
    pub transform: Affine,
    /// Output size in device pixels.
    pub size: Size,
    pub background: Rgba,
    /// Back to front.
    pub commands: Vec<DrawCommand<'a>>,
}

/// Build the frame for the working set plus the stroke in progress.
///
/// Finalized strokes are drawn in working-set order and the in-progress
/// stroke last, on top. Strokes entirely outside the viewport are skipped.
pub fn render<'a>(strokes: &'a [Stroke], in_progress: Option<&'a OpenStroke>, ctx: &RenderContext) -> Frame<'a> {
    let transform = Affine::scale(ctx.scale_factor) * ctx.camera.transform();
    let visible = ctx.camera.visible_canvas(ctx.viewport_size);

    let mut commands: Vec<DrawCommand<'a>> = strokes
        .iter()
        .filter(|stroke| {
            let half = stroke.style().thickness / 2.0;
            overlaps(stroke.bounds().inflate(half, half), visible)
        })
        .map(|stroke| DrawCommand {
            points: stroke.points(),
            color: stroke.style().rgba(),
            width: stroke.style().thickness,
            cap: LineCap::Round,
            join: LineJoin::Round,
            in_progress: false,
        })
        .collect();

    if let Some(open) = in_progress.filter(|open| !open.is_empty()) {
        commands.push(DrawCommand {
            points: open.points(),
            color: open.style().rgba(),
            width: open.style().thickness,
            cap: LineCap::Round,
            join: LineJoin::Round,
            in_progress: true,
        });
    }

    Frame {
        transform,
        size: Size::new(
            ctx.viewport_size.width * ctx.scale_factor,
            ctx.viewport_size.height * ctx.scale_factor,
        ),
        background: ctx.background_color,
        commands,
    }
}

/// Polyline through `points`. A single point becomes a zero-length segment
/// so round caps draw it as a dot.
pub fn stroke_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = points.split_first() else {
        return path;
    };
    path.move_to(*first);
    if rest.is_empty() {
        path.line_to(*first);
    }
    for p in rest {
        path.line_to(*p);
    }
    path
}

/// Closed-interval overlap, so degenerate rects still count.
fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}
