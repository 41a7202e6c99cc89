//! Replay a whiteboard's persisted strokes into an SVG file.

use clap::Parser;
use inkboard_core::{Board, Camera, RemoteConfig, RemoteStrokeStore, StrokeStore, WhiteboardId};
use inkboard_render::{RenderContext, Renderer, SvgRenderer, render};
use kurbo::Size;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const SNAPSHOT_SIZE: Size = Size::new(1600.0, 1000.0);
const SNAPSHOT_PADDING: f64 = 40.0;

#[derive(Parser, Debug)]
#[command(name = "inkboard-snapshot")]
#[command(about = "Render a whiteboard's stroke history to SVG")]
struct Args {
    /// Whiteboard to replay.
    whiteboard_id: WhiteboardId,
    /// Output file. Defaults to `whiteboard-<id>.svg`.
    out: Option<PathBuf>,
    /// Relay server base URL. Falls back to `INKBOARD_SERVER_URL`.
    #[arg(long)]
    server: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

impl Args {
    fn remote_config(&self) -> RemoteConfig {
        let config = match &self.server {
            Some(url) => RemoteConfig::new(url.trim()),
            None => RemoteConfig::from_env(),
        };
        config.with_timeout(Duration::from_secs(self.timeout_secs))
    }

    fn out_path(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("whiteboard-{}.svg", self.whiteboard_id)))
    }
}

fn run(args: &Args) -> Result<usize, Box<dyn std::error::Error>> {
    let config = args.remote_config();
    log::info!("Fetching strokes for {} from {}", args.whiteboard_id, config.server_url);

    let store = RemoteStrokeStore::new(&config)?;
    let rows = pollster::block_on(store.list(&args.whiteboard_id))?;

    let mut board = Board::new();
    board.replace_all(rows.iter().filter_map(|row| row.to_stroke()));
    if board.len() < rows.len() {
        log::warn!("Skipped {} unreadable row(s)", rows.len() - board.len());
    }

    let mut camera = Camera::new();
    if let Some(bounds) = board.bounds() {
        camera.fit_to_bounds(bounds, SNAPSHOT_SIZE, SNAPSHOT_PADDING);
    }

    let mut renderer = SvgRenderer::new();
    renderer.build_scene(&render(board.strokes(), None, &RenderContext::new(camera, SNAPSHOT_SIZE)));
    renderer.save(args.out_path())?;
    Ok(board.len())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(count) => {
            log::info!("Wrote {} stroke(s) to {}", count, args.out_path().display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Snapshot failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "5f0c1d7e-9a43-4c8e-b0d2-2d7a4bb1e001";

    #[test]
    fn test_default_output_path() {
        let args = Args::try_parse_from(["inkboard-snapshot", ID]).unwrap();
        assert_eq!(args.out_path(), PathBuf::from(format!("whiteboard-{}.svg", ID)));
        assert_eq!(args.timeout_secs, 10);
    }

    #[test]
    fn test_server_and_timeout_flags() {
        let args = Args::try_parse_from([
            "inkboard-snapshot",
            ID,
            "board.svg",
            "--server",
            "https://ink.example.com",
            "--timeout-secs",
            "3",
        ])
        .unwrap();
        assert_eq!(args.out_path(), PathBuf::from("board.svg"));
        let config = args.remote_config();
        assert_eq!(config.api_url(), "https://ink.example.com/api");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_malformed_id() {
        assert!(Args::try_parse_from(["inkboard-snapshot", "not-a-uuid"]).is_err());
        assert!(Args::try_parse_from(["inkboard-snapshot"]).is_err());
    }
}
