//! Pointer capture: raw mouse/touch events to canvas-space stroke points.

use crate::camera::Camera;
use crate::stroke::{OpenStroke, StrokeStyle};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Touch lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

/// Pointer event type for unified mouse/touch handling.
///
/// Positions are in client coordinates (the same space as the surface
/// origin in [`Viewport`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    /// Pointer left the drawing surface.
    Leave,
    Scroll { position: Point, delta: Vec2 },
}

impl PointerEvent {
    /// Translate the primary touch point into a pointer event.
    pub fn from_touch(phase: TouchPhase, position: Point) -> Self {
        match phase {
            TouchPhase::Started => PointerEvent::Down {
                position,
                button: MouseButton::Left,
            },
            TouchPhase::Moved => PointerEvent::Move { position },
            TouchPhase::Ended => PointerEvent::Up {
                position,
                button: MouseButton::Left,
            },
            TouchPhase::Cancelled => PointerEvent::Leave,
        }
    }
}

/// Drawing and navigation are mutually exclusive per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Pointer drags draw strokes; pan/zoom gestures are suppressed.
    #[default]
    Draw,
    /// Pointer drags pan and the wheel zooms; nothing is drawn.
    Pan,
}

/// Placement of the drawing surface in client space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Client-space position of the surface's top-left corner.
    pub origin: Point,
    /// Surface size in CSS pixels.
    pub size: Size,
}

impl Viewport {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Client-space point relative to the surface.
    pub fn to_surface(&self, client: Point) -> Point {
        Point::new(client.x - self.origin.x, client.y - self.origin.y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Point::ZERO, Size::new(1280.0, 800.0))
    }
}

/// What a pointer event did.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Ignored,
    StrokeStarted,
    StrokeExtended,
    /// Input ended; the buffer is handed over for finalization.
    StrokeEnded(OpenStroke),
    CameraMoved,
}

/// Turns pointer events into open strokes or camera moves.
///
/// Each event is mapped with the camera as it is when the event is
/// handled; captured points are stored in canvas space and never
/// re-projected.
#[derive(Debug, Clone)]
pub struct PointerCapture {
    mode: InteractionMode,
    open: Option<OpenStroke>,
    pan_anchor: Option<Point>,
    zoom_step: f64,
}

impl PointerCapture {
    pub fn new(mode: InteractionMode, zoom_step: f64) -> Self {
        Self {
            mode,
            open: None,
            pan_anchor: None,
            zoom_step,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch mode. An open stroke is handed back so it can be finalized.
    pub fn set_mode(&mut self, mode: InteractionMode) -> Option<OpenStroke> {
        if self.mode == mode {
            return None;
        }
        self.mode = mode;
        self.pan_anchor = None;
        self.open.take()
    }

    /// The stroke currently being captured, if any.
    pub fn in_progress(&self) -> Option<&OpenStroke> {
        self.open.as_ref()
    }

    pub fn is_capturing(&self) -> bool {
        self.open.is_some()
    }

    /// Process one pointer event.
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        camera: &mut Camera,
        viewport: &Viewport,
        style: &StrokeStyle,
    ) -> CaptureOutcome {
        match self.mode {
            InteractionMode::Draw => self.handle_draw(event, camera, viewport, style),
            InteractionMode::Pan => self.handle_pan(event, camera, viewport),
        }
    }

    fn handle_draw(
        &mut self,
        event: &PointerEvent,
        camera: &Camera,
        viewport: &Viewport,
        style: &StrokeStyle,
    ) -> CaptureOutcome {
        match *event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => {
                let point = camera.client_to_canvas(position, viewport.origin);
                match self.open.as_mut() {
                    // A lost `Up` leaves the buffer open; keep extending it.
                    Some(open) => {
                        open.add_point(point);
                        CaptureOutcome::StrokeExtended
                    }
                    None => {
                        self.open = Some(OpenStroke::begin(point, style.clone()));
                        CaptureOutcome::StrokeStarted
                    }
                }
            }
            PointerEvent::Move { position } => match self.open.as_mut() {
                Some(open) => {
                    open.add_point(camera.client_to_canvas(position, viewport.origin));
                    CaptureOutcome::StrokeExtended
                }
                None => CaptureOutcome::Ignored,
            },
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            }
            | PointerEvent::Leave => match self.open.take() {
                Some(open) => CaptureOutcome::StrokeEnded(open),
                None => CaptureOutcome::Ignored,
            },
            _ => CaptureOutcome::Ignored,
        }
    }

    fn handle_pan(&mut self, event: &PointerEvent, camera: &mut Camera, viewport: &Viewport) -> CaptureOutcome {
        match *event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left | MouseButton::Middle,
            } => {
                self.pan_anchor = Some(viewport.to_surface(position));
                CaptureOutcome::Ignored
            }
            PointerEvent::Move { position } => {
                let Some(anchor) = self.pan_anchor else {
                    return CaptureOutcome::Ignored;
                };
                let current = viewport.to_surface(position);
                camera.pan(current - anchor);
                self.pan_anchor = Some(current);
                CaptureOutcome::CameraMoved
            }
            PointerEvent::Up { .. } | PointerEvent::Leave => {
                self.pan_anchor = None;
                CaptureOutcome::Ignored
            }
            PointerEvent::Scroll { position, delta } => {
                if delta.y == 0.0 {
                    return CaptureOutcome::Ignored;
                }
                let factor = if delta.y < 0.0 {
                    self.zoom_step
                } else {
                    1.0 / self.zoom_step
                };
                camera.zoom_at(viewport.to_surface(position), factor);
                CaptureOutcome::CameraMoved
            }
            _ => CaptureOutcome::Ignored,
        }
    }
}
