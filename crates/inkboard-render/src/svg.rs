//! SVG backend.

use crate::renderer::{RenderResult, Renderer, RendererError};
use crate::scene::{DrawCommand, Frame, LineCap, LineJoin};
use inkboard_core::Rgba;
use std::fmt::Write;

/// Renders frames into a standalone SVG document.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    document: String,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document built by the last [`Renderer::build_scene`] call.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn take_document(&mut self) -> String {
        std::mem::take(&mut self.document)
    }

    /// Write the current document to `path`.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> RenderResult<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.document)
            .map_err(|e| RendererError::Output(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn write_command(out: &mut String, command: &DrawCommand<'_>) {
        let mut d = String::new();
        let mut points = command.points.iter();
        if let Some(first) = points.next() {
            let _ = write!(d, "M{} {}", fmt_num(first.x), fmt_num(first.y));
            if command.points.len() == 1 {
                let _ = write!(d, " L{} {}", fmt_num(first.x), fmt_num(first.y));
            }
            for p in points {
                let _ = write!(d, " L{} {}", fmt_num(p.x), fmt_num(p.y));
            }
        }

        let cap = match command.cap {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
        };
        let join = match command.join {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
        };
        let _ = write!(
            out,
            r#"<path d="{}" fill="none" stroke="{}"{} stroke-width="{}" stroke-linecap="{}" stroke-linejoin="{}"/>"#,
            d,
            hex_rgb(command.color),
            opacity_attr(command.color),
            fmt_num(command.width),
            cap,
            join
        );
    }
}

impl Renderer for SvgRenderer {
    fn build_scene(&mut self, frame: &Frame<'_>) {
        let mut out = String::new();
        let (w, h) = (fmt_num(frame.size.width), fmt_num(frame.size.height));
        let [a, b, c, d, e, f] = frame.transform.as_coeffs();

        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        let _ = write!(
            out,
            r#"<rect width="100%" height="100%" fill="{}"{}/>"#,
            hex_rgb(frame.background),
            fill_opacity_attr(frame.background)
        );
        let _ = write!(
            out,
            r#"<g transform="matrix({} {} {} {} {} {})">"#,
            fmt_num(a),
            fmt_num(b),
            fmt_num(c),
            fmt_num(d),
            fmt_num(e),
            fmt_num(f)
        );
        for command in &frame.commands {
            Self::write_command(&mut out, command);
        }
        out.push_str("</g></svg>");

        log::debug!("Built SVG with {} path(s)", frame.commands.len());
        self.document = out;
    }
}

fn hex_rgb(color: Rgba) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn opacity_attr(color: Rgba) -> String {
    if color.a == 255 {
        String::new()
    } else {
        format!(r#" stroke-opacity="{}""#, fmt_num(color.a as f64 / 255.0))
    }
}

fn fill_opacity_attr(color: Rgba) -> String {
    if color.a == 255 {
        String::new()
    } else {
        format!(r#" fill-opacity="{}""#, fmt_num(color.a as f64 / 255.0))
    }
}

/// Shortest decimal form, trimmed to three places.
fn fmt_num(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderContext;
    use crate::scene::render;
    use inkboard_core::{Camera, Stroke, StrokeId, StrokeStyle, UserId, WhiteboardId};
    use kurbo::{Point, Size};

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(3.0), "3");
        assert_eq!(fmt_num(1.25), "1.25");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(2.0 / 3.0), "0.667");
    }

    #[test]
    fn test_svg_document() {
        let strokes = vec![
            Stroke::from_parts(
                StrokeId::new(),
                WhiteboardId::new(),
                UserId::new("u"),
                vec![Point::new(0.0, 0.0), Point::new(10.0, 5.5)],
                StrokeStyle::new("hsl(0, 100%, 50%)", 3.0),
            )
            .unwrap(),
        ];
        let ctx = RenderContext::new(Camera::new(), Size::new(200.0, 100.0));
        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&render(&strokes, None, &ctx));

        let svg = renderer.document();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 200 100""#));
        assert!(svg.contains(r##"<rect width="100%" height="100%" fill="#ffffff"/>"##));
        assert!(svg.contains(r#"d="M0 0 L10 5.5""#));
        assert!(svg.contains(r##"stroke="#ff0000""##));
        assert!(svg.contains(r#"stroke-linecap="round" stroke-linejoin="round""#));
        assert!(svg.ends_with("</g></svg>"));
    }

    #[test]
    fn test_empty_board() {
        let ctx = RenderContext::new(Camera::new(), Size::new(10.0, 10.0));
        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&render(&[], None, &ctx));
        assert!(!renderer.document().contains("<path"));
        assert!(renderer.take_document().contains("matrix(1 0 0 1 0 0)"));
        assert!(renderer.document().is_empty());
    }

    #[test]
    fn test_save_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.svg");
        let ctx = RenderContext::new(Camera::new(), Size::new(10.0, 10.0));
        let mut renderer = SvgRenderer::new();
        renderer.build_scene(&render(&[], None, &ctx));

        renderer.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), renderer.document());
        assert!(renderer.save(dir.path().join("missing/board.svg")).is_err());
    }
}
