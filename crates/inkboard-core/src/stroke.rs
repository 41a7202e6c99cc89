//! Stroke model: open capture buffers and immutable finalized strokes.

use crate::color::Rgba;
use crate::whiteboard::WhiteboardId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Default line width used when a stroke does not specify one.
pub const DEFAULT_THICKNESS: f64 = 3.0;

/// Minimum number of points for a stroke to be kept.
pub const MIN_STROKE_POINTS: usize = 2;

/// Client-generated stroke identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(pub Uuid);

impl StrokeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StrokeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StrokeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identity of a user, as supplied by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visual attributes of a stroke.
///
/// The CSS color string is what travels over the wire and into the store;
/// the parsed RGBA value is cached for renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    color: String,
    rgba: Rgba,
    /// Line width in canvas units.
    pub thickness: f64,
}

impl StrokeStyle {
    pub fn new(color: impl Into<String>, thickness: f64) -> Self {
        let color = color.into();
        let rgba = Rgba::parse_css_or_black(&color);
        Self {
            color,
            rgba,
            thickness: sanitize_thickness(thickness),
        }
    }

    /// CSS color string as authored.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Parsed color for drawing.
    pub fn rgba(&self) -> Rgba {
        self.rgba
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
        self.rgba = Rgba::parse_css_or_black(&self.color);
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self::new("#000000", DEFAULT_THICKNESS)
    }
}

fn sanitize_thickness(thickness: f64) -> f64 {
    if thickness.is_finite() && thickness > 0.0 {
        thickness
    } else {
        DEFAULT_THICKNESS
    }
}

/// A stroke still being captured by the local client.
///
/// Exists only in the authoring client's transient buffer until
/// [`OpenStroke::finalize`] freezes it.
#[derive(Debug, Clone)]
pub struct OpenStroke {
    points: Vec<Point>,
    style: StrokeStyle,
}

impl OpenStroke {
    /// Start a new buffer at the first captured point.
    pub fn begin(first: Point, style: StrokeStyle) -> Self {
        Self {
            points: vec![first],
            style,
        }
    }

    /// Append a canvas-space point.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Freeze the buffer into an immutable stroke.
    ///
    /// Returns `None` when fewer than `min_points` were captured (an
    /// accidental tap). Otherwise assigns a fresh id.
    pub fn finalize(self, whiteboard_id: WhiteboardId, author_id: UserId, min_points: usize) -> Option<Stroke> {
        if self.points.len() < min_points.max(MIN_STROKE_POINTS) {
            log::debug!("Discarding {}-point stroke", self.points.len());
            return None;
        }
        Some(Stroke {
            id: StrokeId::new(),
            whiteboard_id,
            author_id,
            points: self.points.into(),
            style: self.style,
        })
    }
}

/// A finalized stroke. Never mutated once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    id: StrokeId,
    whiteboard_id: WhiteboardId,
    author_id: UserId,
    points: Arc<[Point]>,
    style: StrokeStyle,
}

impl Stroke {
    /// Rebuild a stroke received from a peer or loaded from the store.
    ///
    /// Returns `None` for payloads with fewer than two points.
    pub fn from_parts(
        id: StrokeId,
        whiteboard_id: WhiteboardId,
        author_id: UserId,
        points: Vec<Point>,
        style: StrokeStyle,
    ) -> Option<Self> {
        if points.len() < MIN_STROKE_POINTS {
            return None;
        }
        Some(Self {
            id,
            whiteboard_id,
            author_id,
            points: points.into(),
            style,
        })
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn whiteboard_id(&self) -> WhiteboardId {
        self.whiteboard_id
    }

    pub fn author_id(&self) -> &UserId {
        &self.author_id
    }

    /// Ordered canvas-space points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box of the stroke's points (ignores line width).
    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> WhiteboardId {
        WhiteboardId::new()
    }

    #[test]
    fn test_single_point_is_discarded() {
        let open = OpenStroke::begin(Point::new(1.0, 1.0), StrokeStyle::default());
        assert!(open.finalize(board(), UserId::new("u"), MIN_STROKE_POINTS).is_none());
    }

    #[test]
    fn test_finalize_keeps_points_in_order() {
        let mut open = OpenStroke::begin(Point::new(0.0, 0.0), StrokeStyle::default());
        open.add_point(Point::new(1.0, 2.0));
        open.add_point(Point::new(3.0, 4.0));

        let stroke = open.finalize(board(), UserId::new("u"), MIN_STROKE_POINTS).unwrap();
        assert_eq!(
            stroke.points(),
            &[Point::new(0.0, 0.0), Point::new(1.0, 2.0), Point::new(3.0, 4.0)]
        );
    }

    #[test]
    fn test_finalize_assigns_unique_ids() {
        let make = || {
            let mut open = OpenStroke::begin(Point::ZERO, StrokeStyle::default());
            open.add_point(Point::new(1.0, 1.0));
            open.finalize(board(), UserId::new("u"), MIN_STROKE_POINTS).unwrap()
        };
        assert_ne!(make().id(), make().id());
    }

    #[test]
    fn test_min_points_cannot_go_below_two() {
        let open = OpenStroke::begin(Point::ZERO, StrokeStyle::default());
        assert!(open.finalize(board(), UserId::new("u"), 0).is_none());
    }

    #[test]
    fn test_from_parts_rejects_short_strokes() {
        let stroke = Stroke::from_parts(
            StrokeId::new(),
            board(),
            UserId::new("u"),
            vec![Point::ZERO],
            StrokeStyle::default(),
        );
        assert!(stroke.is_none());
    }

    #[test]
    fn test_invalid_thickness_uses_default() {
        assert_eq!(StrokeStyle::new("#000", -1.0).thickness, DEFAULT_THICKNESS);
        assert_eq!(StrokeStyle::new("#000", f64::NAN).thickness, DEFAULT_THICKNESS);
    }

    #[test]
    fn test_bounds() {
        let stroke = Stroke::from_parts(
            StrokeId::new(),
            board(),
            UserId::new("u"),
            vec![Point::new(0.0, 10.0), Point::new(50.0, -5.0), Point::new(20.0, 30.0)],
            StrokeStyle::default(),
        )
        .unwrap();
        assert_eq!(stroke.bounds(), Rect::new(0.0, -5.0, 50.0, 30.0));
    }
}
