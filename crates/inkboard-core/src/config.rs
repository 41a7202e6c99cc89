//! Client configuration.

use crate::input::InteractionMode;
use crate::stroke::{DEFAULT_THICKNESS, MIN_STROKE_POINTS};
use std::time::Duration;

/// Default relay server base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3030";

/// Environment variable overriding [`DEFAULT_SERVER_URL`].
pub const SERVER_URL_ENV: &str = "INKBOARD_SERVER_URL";

/// Per-session drawing and navigation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Strokes with fewer captured points are discarded.
    pub min_points: usize,
    /// Line width for new strokes.
    pub thickness: f64,
    /// Explicit stroke color. `None` uses the author's derived color.
    pub color: Option<String>,
    /// Mode the session starts in.
    pub initial_mode: InteractionMode,
    /// Zoom multiplier per wheel notch in pan mode.
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_points: MIN_STROKE_POINTS,
            thickness: DEFAULT_THICKNESS,
            color: None,
            initial_mode: InteractionMode::Draw,
            zoom_step: 1.1,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl SessionConfig {
    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_mode(mut self, mode: InteractionMode) -> Self {
        self.initial_mode = mode;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }
}

/// Where the relay server lives.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// Base HTTP(S) URL, e.g. `http://localhost:3030`.
    pub server_url: String,
    /// Timeout for record store requests.
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl RemoteConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Read [`SERVER_URL_ENV`], falling back to the default URL.
    pub fn from_env() -> Self {
        match std::env::var(SERVER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// Base URL of the REST API.
    pub fn api_url(&self) -> String {
        format!("{}/api", self.base())
    }

    /// WebSocket endpoint of the broadcast relay.
    pub fn ws_url(&self) -> String {
        let base = self.base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws", ws_base)
    }
}
