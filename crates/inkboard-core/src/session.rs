//! Whiteboard session: bootstrap replay, then live drawing and sync.
//!
//! A session starts in [`SessionPhase::Loading`]. [`WhiteboardSession::bootstrap`]
//! loads the durable history, subscribes to the broadcast topic and moves
//! to [`SessionPhase::Live`]. From then on the host feeds pointer events in
//! with [`WhiteboardSession::handle_pointer`] and calls
//! [`WhiteboardSession::poll`] once per frame to pick up remote strokes.
//!
//! Everything runs on the host's UI thread. Publish and persist are fire
//! and forget; failures are logged and never reach the drawing path.

use crate::board::Board;
use crate::broadcast::{BroadcastError, BroadcastHub, Topic, TopicEvent};
use crate::camera::Camera;
use crate::color::author_color;
use crate::config::SessionConfig;
use crate::identity::IdentityProvider;
use crate::input::{CaptureOutcome, InteractionMode, PointerCapture, PointerEvent, Viewport};
use crate::storage::{Persister, StorageError, StrokeRecord, StrokeStore};
use crate::stroke::{OpenStroke, Stroke, StrokeId, StrokeStyle, UserId};
use crate::whiteboard::{PLACEHOLDER_TITLE, WhiteboardDirectory, WhiteboardId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No signed-in user")]
    NotAuthenticated,
    #[error("Session is still loading")]
    NotLive,
    #[error("Broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// History is loading; local input is ignored.
    Loading,
    /// Subscribed and accepting input.
    Live,
}

/// Things that happened since the last [`WhiteboardSession::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RemoteStroke { id: StrokeId, author: UserId },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// The broadcast link is gone; call [`WhiteboardSession::reconnect`].
    LinkLost,
}

/// Degradations worth showing to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    HistoryUnavailable { reason: String },
    TitleUnavailable { reason: String },
}

impl SessionNotice {
    pub fn message(&self) -> String {
        match self {
            SessionNotice::HistoryUnavailable { reason } => format!("Could not load existing strokes: {}", reason),
            SessionNotice::TitleUnavailable { reason } => format!("Could not load whiteboard details: {}", reason),
        }
    }
}

/// Collaborators a session talks to.
#[derive(Clone)]
pub struct Services {
    pub hub: Arc<dyn BroadcastHub>,
    pub store: Arc<dyn StrokeStore>,
    pub persister: Arc<dyn Persister>,
    pub directory: Arc<dyn WhiteboardDirectory>,
}

impl Services {
    pub fn new(
        hub: Arc<dyn BroadcastHub>,
        store: Arc<dyn StrokeStore>,
        persister: Arc<dyn Persister>,
        directory: Arc<dyn WhiteboardDirectory>,
    ) -> Self {
        Self {
            hub,
            store,
            persister,
            directory,
        }
    }

    /// Services backed by the relay server at `config.server_url`.
    #[cfg(feature = "remote")]
    pub fn remote(config: &crate::config::RemoteConfig) -> Result<Self, SessionError> {
        use crate::broadcast::WsHub;
        use crate::storage::{BackgroundPersister, RemoteDirectory, RemoteStrokeStore};

        let store: Arc<dyn StrokeStore> = Arc::new(RemoteStrokeStore::new(config)?);
        Ok(Self {
            hub: Arc::new(WsHub::new(config)?),
            persister: Arc::new(BackgroundPersister::new(store.clone())),
            store,
            directory: Arc::new(RemoteDirectory::new(config)?),
        })
    }
}

/// One client's view of one whiteboard.
pub struct WhiteboardSession {
    whiteboard_id: WhiteboardId,
    user: UserId,
    config: SessionConfig,
    services: Services,
    phase: SessionPhase,
    title: String,
    board: Board,
    camera: Camera,
    viewport: Viewport,
    capture: PointerCapture,
    style: StrokeStyle,
    topic: Option<Box<dyn Topic>>,
    inbox: Rc<RefCell<Vec<Stroke>>>,
    pending: Vec<SessionEvent>,
    notices: Vec<SessionNotice>,
    link_lost: bool,
    needs_redraw: bool,
}

impl WhiteboardSession {
    /// Create a session in the Loading phase.
    ///
    /// Fails with [`SessionError::NotAuthenticated`] when there is no
    /// signed-in user.
    pub fn open(
        whiteboard_id: WhiteboardId,
        identity: &dyn IdentityProvider,
        config: SessionConfig,
        services: Services,
    ) -> Result<Self, SessionError> {
        let user = identity.current_user().ok_or(SessionError::NotAuthenticated)?;
        let color = config.color.clone().unwrap_or_else(|| author_color(user.as_str()));
        let style = StrokeStyle::new(color, config.thickness);

        log::info!("Opening {} as {}", whiteboard_id.topic(), user);
        Ok(Self {
            whiteboard_id,
            user,
            camera: Camera::with_limits(config.min_zoom, config.max_zoom),
            viewport: Viewport::default(),
            capture: PointerCapture::new(config.initial_mode, config.zoom_step),
            style,
            config,
            services,
            phase: SessionPhase::Loading,
            title: PLACEHOLDER_TITLE.to_string(),
            board: Board::new(),
            topic: None,
            inbox: Rc::new(RefCell::new(Vec::new())),
            pending: Vec::new(),
            notices: Vec::new(),
            link_lost: false,
            needs_redraw: true,
        })
    }

    /// Load title and history, then subscribe and go Live.
    ///
    /// Never fails: a failed history load leaves an empty working set and
    /// records a notice.
    pub async fn bootstrap(&mut self) {
        if self.phase == SessionPhase::Live {
            log::debug!("{} already live", self.whiteboard_id.topic());
            return;
        }
        log::info!("Bootstrapping {}", self.whiteboard_id.topic());

        match self.services.directory.get(&self.whiteboard_id).await {
            Ok(whiteboard) => self.title = whiteboard.display_title().to_string(),
            Err(e) => {
                log::warn!("Failed to load whiteboard {}: {}", self.whiteboard_id, e);
                self.title = PLACEHOLDER_TITLE.to_string();
                self.notices.push(SessionNotice::TitleUnavailable { reason: e.to_string() });
            }
        }

        match self.load_history().await {
            Ok(strokes) => {
                self.board.replace_all(strokes);
                log::info!("Replayed {} stroke(s) on {}", self.board.len(), self.whiteboard_id.topic());
            }
            Err(e) => {
                log::warn!("Failed to load strokes for {}: {}", self.whiteboard_id, e);
                self.board.replace_all(Vec::new());
                self.notices.push(SessionNotice::HistoryUnavailable { reason: e.to_string() });
            }
        }

        if let Err(e) = self.open_topic() {
            log::warn!("Failed to subscribe to {}: {}", self.whiteboard_id.topic(), e);
            self.mark_link_lost();
        }

        self.phase = SessionPhase::Live;
        self.needs_redraw = true;
    }

    /// Re-open the broadcast topic and merge strokes missed while offline.
    ///
    /// Subscribes first, then re-lists, so nothing published in between is
    /// lost. Returns how many strokes were added.
    pub async fn reconnect(&mut self) -> Result<usize, SessionError> {
        if self.phase != SessionPhase::Live {
            return Err(SessionError::NotLive);
        }
        self.close_topic();
        self.open_topic()?;
        self.link_lost = false;

        let added = match self.load_history().await {
            Ok(strokes) => self.board.merge(strokes),
            Err(e) => {
                log::warn!("Failed to resync {}: {}", self.whiteboard_id, e);
                self.notices.push(SessionNotice::HistoryUnavailable { reason: e.to_string() });
                0
            }
        };
        if added > 0 {
            self.needs_redraw = true;
        }
        log::info!("Reconnected {}, merged {} stroke(s)", self.whiteboard_id.topic(), added);
        Ok(added)
    }

    async fn load_history(&self) -> Result<Vec<Stroke>, StorageError> {
        let rows = self.services.store.list(&self.whiteboard_id).await?;
        Ok(rows.iter().filter_map(|row| row.to_stroke()).collect())
    }

    fn open_topic(&mut self) -> Result<(), BroadcastError> {
        let mut topic = self.services.hub.connect(&self.whiteboard_id)?;
        let inbox = self.inbox.clone();
        topic.subscribe(Box::new(move |stroke| inbox.borrow_mut().push(stroke)))?;
        self.topic = Some(topic);
        Ok(())
    }

    fn close_topic(&mut self) {
        if let Some(mut topic) = self.topic.take() {
            topic.close();
        }
    }

    fn mark_link_lost(&mut self) {
        if !self.link_lost {
            self.link_lost = true;
            self.pending.push(SessionEvent::LinkLost);
        }
    }

    /// Feed one pointer event. Returns the stroke if this event finalized one.
    ///
    /// Input is ignored until the session is Live.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<Stroke> {
        if self.phase != SessionPhase::Live {
            log::trace!("Ignoring input while loading");
            return None;
        }
        match self
            .capture
            .handle(&event, &mut self.camera, &self.viewport, &self.style)
        {
            CaptureOutcome::Ignored => None,
            CaptureOutcome::StrokeStarted | CaptureOutcome::StrokeExtended | CaptureOutcome::CameraMoved => {
                self.needs_redraw = true;
                None
            }
            CaptureOutcome::StrokeEnded(open) => self.commit(open),
        }
    }

    /// Finalize and hand the stroke to the working set, the topic and the
    /// persister, in that order.
    fn commit(&mut self, open: OpenStroke) -> Option<Stroke> {
        self.needs_redraw = true;
        let stroke = open.finalize(self.whiteboard_id, self.user.clone(), self.config.min_points)?;

        self.board.push(stroke.clone());

        match self.topic.as_mut() {
            Some(topic) => {
                if let Err(e) = topic.publish(&stroke) {
                    log::warn!("Failed to broadcast stroke {}: {}", stroke.id(), e);
                }
            }
            None => log::warn!("Not subscribed, stroke {} was not broadcast", stroke.id()),
        }

        self.services.persister.persist(StrokeRecord::from(&stroke));
        Some(stroke)
    }

    /// Drain remote strokes and link events.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let topic_events = self.topic.as_mut().map(|t| t.poll_events()).unwrap_or_default();
        for event in topic_events {
            match event {
                TopicEvent::Disconnected => {
                    log::warn!("Lost link to {}", self.whiteboard_id.topic());
                    self.mark_link_lost();
                }
                TopicEvent::Error { message } => {
                    log::warn!("Link error on {}: {}", self.whiteboard_id.topic(), message);
                    self.mark_link_lost();
                }
                TopicEvent::PeerJoined { peer_id } => {
                    log::info!("Peer {} joined {}", peer_id, self.whiteboard_id.topic());
                    self.pending.push(SessionEvent::PeerJoined { peer_id });
                }
                TopicEvent::PeerLeft { peer_id } => {
                    log::info!("Peer {} left {}", peer_id, self.whiteboard_id.topic());
                    self.pending.push(SessionEvent::PeerLeft { peer_id });
                }
                TopicEvent::Connected | TopicEvent::Joined { .. } => {
                    log::debug!("{:?} on {}", event, self.whiteboard_id.topic());
                }
            }
        }

        let mut events = std::mem::take(&mut self.pending);
        let incoming: Vec<Stroke> = self.inbox.borrow_mut().drain(..).collect();
        for stroke in incoming {
            let id = stroke.id();
            let author = stroke.author_id().clone();
            if self.board.push(stroke) {
                self.needs_redraw = true;
                events.push(SessionEvent::RemoteStroke { id, author });
            }
        }
        events
    }

    /// Switch between drawing and navigation. A stroke in progress is
    /// finalized first and returned.
    pub fn set_mode(&mut self, mode: InteractionMode) -> Option<Stroke> {
        let open = self.capture.set_mode(mode)?;
        self.commit(open)
    }

    pub fn mode(&self) -> InteractionMode {
        self.capture.mode()
    }

    /// Color for subsequent strokes.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.style.set_color(color);
    }

    /// Line width for subsequent strokes.
    pub fn set_thickness(&mut self, thickness: f64) {
        self.style = StrokeStyle::new(self.style.color().to_string(), thickness);
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    /// The drawing surface moved or was resized.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.needs_redraw = true;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the view transform (e.g. "fit to content").
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.needs_redraw = true;
    }

    /// Returns and clears the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn strokes(&self) -> &[Stroke] {
        self.board.strokes()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn in_progress(&self) -> Option<&OpenStroke> {
        self.capture.in_progress()
    }

    pub fn notices(&self) -> &[SessionNotice] {
        &self.notices
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn whiteboard_id(&self) -> WhiteboardId {
        self.whiteboard_id
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Whether the broadcast link is believed to be up.
    pub fn is_linked(&self) -> bool {
        self.topic.is_some() && !self.link_lost
    }

    /// Unsubscribe and release the topic. A stroke in progress is dropped.
    pub fn leave(mut self) {
        self.close_topic();
    }
}

impl Drop for WhiteboardSession {
    fn drop(&mut self) {
        if self.topic.is_some() {
            log::info!("Leaving {}", self.whiteboard_id.topic());
        }
        self.close_topic();
    }
}
