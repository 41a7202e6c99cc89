//! In-process broadcast hub.
//!
//! Every [`LocalTopic`] connected to the same [`LocalHub`] sees the others'
//! strokes, which makes multi-client sessions testable in one process.

use super::{BroadcastError, BroadcastHub, BroadcastResult, ConnectionState, StrokeHandler, Topic, TopicEvent};
use crate::stroke::Stroke;
use crate::whiteboard::WhiteboardId;
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex};

enum LocalMessage {
    Stroke(Stroke),
    PeerJoined(String),
    PeerLeft(String),
    Disconnected,
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<WhiteboardId, BTreeMap<u64, Sender<LocalMessage>>>,
    next_peer: u64,
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> BroadcastError {
    BroadcastError::Transport(format!("Lock error: {}", e))
}

/// Hub whose topics live in this process.
#[derive(Clone, Default)]
pub struct LocalHub {
    state: Arc<Mutex<HubState>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on a whiteboard.
    pub fn subscriber_count(&self, whiteboard_id: &WhiteboardId) -> usize {
        self.state
            .lock()
            .map(|state| state.rooms.get(whiteboard_id).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Drop every subscription on a whiteboard, as if the link went down.
    pub fn disconnect_all(&self, whiteboard_id: &WhiteboardId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if let Some(room) = state.rooms.remove(whiteboard_id) {
            log::info!("Dropping {} subscriber(s) on {}", room.len(), whiteboard_id.topic());
            for tx in room.values() {
                let _ = tx.send(LocalMessage::Disconnected);
            }
        }
    }
}

impl BroadcastHub for LocalHub {
    fn connect(&self, whiteboard_id: &WhiteboardId) -> BroadcastResult<Box<dyn Topic>> {
        let peer = {
            let mut state = self.state.lock().map_err(lock_error)?;
            state.next_peer += 1;
            state.next_peer
        };
        log::debug!("Local peer {} opened {}", peer, whiteboard_id.topic());
        Ok(Box::new(LocalTopic {
            hub: self.state.clone(),
            whiteboard_id: *whiteboard_id,
            peer,
            rx: None,
            handler: None,
            state: ConnectionState::Connected,
            pending: vec![TopicEvent::Connected],
            closed: false,
        }))
    }
}

/// Topic handle from a [`LocalHub`].
pub struct LocalTopic {
    hub: Arc<Mutex<HubState>>,
    whiteboard_id: WhiteboardId,
    peer: u64,
    rx: Option<Receiver<LocalMessage>>,
    handler: Option<StrokeHandler>,
    state: ConnectionState,
    pending: Vec<TopicEvent>,
    closed: bool,
}

impl LocalTopic {
    fn peer_id(&self) -> String {
        format!("local-{}", self.peer)
    }

    /// Send to every other subscriber of this whiteboard.
    fn fan_out(&self, make: impl Fn() -> LocalMessage) -> BroadcastResult<()> {
        let state = self.hub.lock().map_err(lock_error)?;
        if let Some(room) = state.rooms.get(&self.whiteboard_id) {
            for (peer, tx) in room {
                if *peer != self.peer {
                    let _ = tx.send(make());
                }
            }
        }
        Ok(())
    }
}

impl Topic for LocalTopic {
    fn whiteboard_id(&self) -> WhiteboardId {
        self.whiteboard_id
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn subscribe(&mut self, handler: StrokeHandler) -> BroadcastResult<()> {
        if self.closed {
            return Err(BroadcastError::Closed);
        }
        if self.state != ConnectionState::Connected {
            return Err(BroadcastError::NotConnected);
        }
        let (tx, rx) = channel();
        let peer_count = {
            let mut state = self.hub.lock().map_err(lock_error)?;
            let room = state.rooms.entry(self.whiteboard_id).or_default();
            room.insert(self.peer, tx);
            room.len()
        };
        self.rx = Some(rx);
        self.handler = Some(handler);
        self.pending.push(TopicEvent::Joined { peer_count });

        let peer_id = self.peer_id();
        self.fan_out(|| LocalMessage::PeerJoined(peer_id.clone()))
    }

    fn publish(&mut self, stroke: &Stroke) -> BroadcastResult<()> {
        if self.closed {
            return Err(BroadcastError::Closed);
        }
        if self.state != ConnectionState::Connected {
            return Err(BroadcastError::NotConnected);
        }
        self.fan_out(|| LocalMessage::Stroke(stroke.clone()))
    }

    fn poll_events(&mut self) -> Vec<TopicEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let Some(rx) = self.rx.take() else {
            return events;
        };

        let mut connected = true;
        loop {
            match rx.try_recv() {
                Ok(LocalMessage::Stroke(stroke)) => {
                    if let Some(handler) = self.handler.as_mut() {
                        handler(stroke);
                    }
                }
                Ok(LocalMessage::PeerJoined(peer_id)) => events.push(TopicEvent::PeerJoined { peer_id }),
                Ok(LocalMessage::PeerLeft(peer_id)) => events.push(TopicEvent::PeerLeft { peer_id }),
                Ok(LocalMessage::Disconnected) | Err(TryRecvError::Disconnected) => {
                    connected = false;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        if connected {
            self.rx = Some(rx);
        } else {
            self.state = ConnectionState::Disconnected;
            self.handler = None;
            events.push(TopicEvent::Disconnected);
        }
        events
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.handler = None;
        self.state = ConnectionState::Disconnected;

        if self.rx.take().is_some() {
            let peer_id = self.peer_id();
            let _ = self.fan_out(|| LocalMessage::PeerLeft(peer_id.clone()));
            if let Ok(mut state) = self.hub.lock() {
                if let Some(room) = state.rooms.get_mut(&self.whiteboard_id) {
                    room.remove(&self.peer);
                    if room.is_empty() {
                        state.rooms.remove(&self.whiteboard_id);
                    }
                }
            }
        }
        log::debug!("Local peer {} closed {}", self.peer, self.whiteboard_id.topic());
    }
}

impl Drop for LocalTopic {
    fn drop(&mut self) {
        self.close();
    }
}
