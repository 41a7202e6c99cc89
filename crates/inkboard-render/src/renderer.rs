//! Renderer trait abstraction.

use crate::scene::Frame;
use inkboard_core::{Camera, Rgba};
use kurbo::Size;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Output error: {0}")]
    Output(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// View transform in effect for this frame.
    pub camera: Camera,
    /// Viewport size in CSS pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Background color.
    pub background_color: Rgba,
}

impl RenderContext {
    /// Create a new render context.
    pub fn new(camera: Camera, viewport_size: Size) -> Self {
        Self {
            camera,
            viewport_size,
            scale_factor: 1.0,
            background_color: Rgba::WHITE,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Rgba) -> Self {
        self.background_color = color;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer: Send + Sync {
    /// Build the backend's scene for a frame, replacing the previous one.
    fn build_scene(&mut self, frame: &Frame<'_>);
}
