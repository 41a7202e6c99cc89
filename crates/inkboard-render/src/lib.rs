//! Inkboard Render Library
//!
//! Turns the working set of strokes into draw commands and hands them to a
//! backend. The SVG backend is always available; the Vello backend is
//! behind the `vello-renderer` feature.

mod renderer;
mod scene;
mod svg;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use scene::{DrawCommand, Frame, LineCap, LineJoin, render, stroke_path};
pub use svg::SvgRenderer;

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloRenderer;
