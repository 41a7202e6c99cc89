//! WebSocket topic client for the relay server.
//!
//! Uses a background thread for non-blocking operation; the owner drains
//! its output with [`Topic::poll_events`].

use super::protocol::{ClientMessage, ServerMessage};
use super::{BroadcastError, BroadcastHub, BroadcastResult, ConnectionState, StrokeHandler, Topic, TopicEvent};
use crate::config::RemoteConfig;
use crate::stroke::Stroke;
use crate::whiteboard::WhiteboardId;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// What the WebSocket thread reports back.
enum WsEvent {
    Connected,
    Disconnected,
    Message(ServerMessage),
    Error(String),
}

/// Hub that opens one WebSocket per topic against the relay server.
#[derive(Debug, Clone)]
pub struct WsHub {
    url: String,
}

impl WsHub {
    /// Validate the relay URL from `config`.
    pub fn new(config: &RemoteConfig) -> BroadcastResult<Self> {
        Self::with_url(&config.ws_url())
    }

    pub fn with_url(url: &str) -> BroadcastResult<Self> {
        let parsed = Url::parse(url).map_err(|e| BroadcastError::Transport(format!("Invalid URL: {}", e)))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(BroadcastError::Transport(format!(
                "Invalid WebSocket URL scheme: {}",
                parsed.scheme()
            )));
        }
        Ok(Self { url: url.to_string() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl BroadcastHub for WsHub {
    fn connect(&self, whiteboard_id: &WhiteboardId) -> BroadcastResult<Box<dyn Topic>> {
        Ok(Box::new(WsTopic::open(&self.url, *whiteboard_id)?))
    }
}

/// One whiteboard topic over a dedicated WebSocket.
pub struct WsTopic {
    whiteboard_id: WhiteboardId,
    state: ConnectionState,
    handler: Option<StrokeHandler>,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<WsEvent>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl WsTopic {
    fn open(url: &str, whiteboard_id: WhiteboardId) -> BroadcastResult<Self> {
        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<WsEvent>();
        let url = url.to_string();

        let handle = thread::Builder::new()
            .name(format!("inkboard-ws-{}", whiteboard_id))
            .spawn(move || run_socket(&url, cmd_rx, event_tx))
            .map_err(|e| BroadcastError::Transport(format!("Failed to spawn socket thread: {}", e)))?;

        log::info!("Opening {}", whiteboard_id.topic());
        Ok(Self {
            whiteboard_id,
            state: ConnectionState::Connecting,
            handler: None,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            _thread: Some(handle),
        })
    }

    /// Topic fed by hand instead of a socket thread.
    #[cfg(test)]
    fn detached(whiteboard_id: WhiteboardId) -> (Self, Receiver<WsCommand>, Sender<WsEvent>) {
        let (cmd_tx, cmd_rx) = channel();
        let (event_tx, event_rx) = channel();
        let topic = Self {
            whiteboard_id,
            state: ConnectionState::Connecting,
            handler: None,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            _thread: None,
        };
        (topic, cmd_rx, event_tx)
    }

    fn send(&self, msg: &ClientMessage) -> BroadcastResult<()> {
        match &self.cmd_tx {
            Some(tx) => send_message(tx, msg),
            None => Err(BroadcastError::Closed),
        }
    }

    /// Commands queue until the socket is up, so sending while connecting is fine.
    fn ensure_open(&self) -> BroadcastResult<()> {
        if self.cmd_tx.is_none() {
            return Err(BroadcastError::Closed);
        }
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Error => Err(BroadcastError::NotConnected),
        }
    }
}

impl Topic for WsTopic {
    fn whiteboard_id(&self) -> WhiteboardId {
        self.whiteboard_id
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn subscribe(&mut self, handler: StrokeHandler) -> BroadcastResult<()> {
        self.ensure_open()?;
        self.send(&ClientMessage::Join {
            whiteboard: self.whiteboard_id,
        })?;
        self.handler = Some(handler);
        Ok(())
    }

    fn publish(&mut self, stroke: &Stroke) -> BroadcastResult<()> {
        self.ensure_open()?;
        self.send(&ClientMessage::Stroke { stroke: stroke.into() })
    }

    fn poll_events(&mut self) -> Vec<TopicEvent> {
        let mut events = Vec::new();
        let Some(rx) = self.event_rx.as_ref() else {
            return events;
        };

        loop {
            let event = match rx.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state != ConnectionState::Disconnected {
                        self.state = ConnectionState::Disconnected;
                        events.push(TopicEvent::Disconnected);
                    }
                    break;
                }
            };
            match event {
                WsEvent::Connected => {
                    self.state = ConnectionState::Connected;
                    events.push(TopicEvent::Connected);
                }
                WsEvent::Disconnected => {
                    self.state = ConnectionState::Disconnected;
                    events.push(TopicEvent::Disconnected);
                }
                WsEvent::Error(message) => {
                    self.state = ConnectionState::Error;
                    events.push(TopicEvent::Error { message });
                }
                WsEvent::Message(ServerMessage::Stroke { from, stroke }) => {
                    match stroke.into_stroke(self.whiteboard_id) {
                        Some(stroke) => {
                            if let Some(handler) = self.handler.as_mut() {
                                handler(stroke);
                            }
                        }
                        None => log::debug!("Dropping stroke from {} with too few points", from),
                    }
                }
                WsEvent::Message(ServerMessage::Joined { peer_count, .. }) => {
                    events.push(TopicEvent::Joined { peer_count });
                }
                WsEvent::Message(ServerMessage::PeerJoined { peer_id }) => {
                    events.push(TopicEvent::PeerJoined { peer_id });
                }
                WsEvent::Message(ServerMessage::PeerLeft { peer_id }) => {
                    events.push(TopicEvent::PeerLeft { peer_id });
                }
                WsEvent::Message(ServerMessage::Error { message }) => {
                    log::warn!("Relay error on {}: {}", self.whiteboard_id.topic(), message);
                    events.push(TopicEvent::Error { message });
                }
            }
        }
        events
    }

    fn close(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = send_message(&tx, &ClientMessage::Leave);
            let _ = tx.send(WsCommand::Close);
            log::info!("Closed {}", self.whiteboard_id.topic());
        }
        self.handler = None;
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for WsTopic {
    fn drop(&mut self) {
        self.close();
    }
}

fn send_message(tx: &Sender<WsCommand>, msg: &ClientMessage) -> BroadcastResult<()> {
    let text = serde_json::to_string(msg).map_err(|e| BroadcastError::Serialization(e.to_string()))?;
    tx.send(WsCommand::Send(text))
        .map_err(|e| BroadcastError::Transport(format!("Send failed: {}", e)))
}

type Socket = tungstenite::WebSocket<tungstenite::stream::MaybeTlsStream<std::net::TcpStream>>;

/// Whether the socket loop keeps going.
enum Flow {
    Continue,
    Stop,
}

/// Read timeout; queued commands are flushed between reads.
const READ_TICK: Duration = Duration::from_millis(50);

fn preview(text: &str) -> &str {
    let end = text.char_indices().nth(120).map_or(text.len(), |(i, _)| i);
    &text[..end]
}

/// Socket loop run on the topic's thread. Always ends with
/// [`WsEvent::Disconnected`] unless the connection never came up.
fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<WsEvent>) {
    let mut socket = match connect(url) {
        Ok((socket, response)) => {
            log::info!("Connected to {} ({})", url, response.status());
            socket
        }
        Err(e) => {
            log::warn!("Could not reach relay at {}: {}", url, e);
            let _ = event_tx.send(WsEvent::Error(format!("Connection failed: {}", e)));
            return;
        }
    };
    let _ = event_tx.send(WsEvent::Connected);

    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(READ_TICK));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    while let Flow::Continue = flush_commands(&mut socket, &cmd_rx) {
        if let Flow::Stop = read_frame(&mut socket, &event_tx) {
            break;
        }
    }

    log::debug!("Socket thread for {} exiting", url);
    let _ = event_tx.send(WsEvent::Disconnected);
}

/// Send everything queued since the last tick.
fn flush_commands(socket: &mut Socket, cmd_rx: &Receiver<WsCommand>) -> Flow {
    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(text)) => {
                log::trace!("-> {}", preview(&text));
                if let Err(e) = socket.send(Message::Text(text)) {
                    log::warn!("Relay send failed: {}", e);
                    return Flow::Stop;
                }
            }
            Ok(WsCommand::Close) => {
                let _ = socket.close(None);
                return Flow::Stop;
            }
            Err(TryRecvError::Disconnected) => return Flow::Stop,
            Err(TryRecvError::Empty) => return Flow::Continue,
        }
    }
}

/// Wait up to one tick for a frame and forward it.
fn read_frame(socket: &mut Socket, event_tx: &Sender<WsEvent>) -> Flow {
    match socket.read() {
        Ok(Message::Text(text)) => {
            match serde_json::from_str::<ServerMessage>(&text) {
                Ok(msg) => {
                    if event_tx.send(WsEvent::Message(msg)).is_err() {
                        return Flow::Stop;
                    }
                }
                Err(e) => log::debug!("Dropping unreadable relay frame ({}): {}", e, preview(&text)),
            }
            Flow::Continue
        }
        Ok(Message::Ping(data)) => {
            let _ = socket.send(Message::Pong(data));
            Flow::Continue
        }
        Ok(Message::Close(frame)) => {
            log::info!("Relay closed the connection: {:?}", frame);
            Flow::Stop
        }
        Ok(_) => Flow::Continue,
        Err(tungstenite::Error::Io(e))
            if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) =>
        {
            Flow::Continue
        }
        Err(e) => {
            log::warn!("Relay read failed: {}", e);
            Flow::Stop
        }
    }
}
