//! Wire messages exchanged with the relay server.

use crate::stroke::{DEFAULT_THICKNESS, Stroke, StrokeId, StrokeStyle, UserId};
use crate::whiteboard::WhiteboardId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

fn default_thickness() -> f64 {
    DEFAULT_THICKNESS
}

fn default_color() -> String {
    "#000000".to_string()
}

/// The "stroke" event body as it travels between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokePayload {
    /// Missing on payloads from older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StrokeId>,
    pub points: Vec<Point>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    pub user_id: UserId,
}

impl StrokePayload {
    /// Rebuild a stroke for the working set.
    ///
    /// A missing id gets a fresh one. Returns `None` for payloads with
    /// fewer than two points.
    pub fn into_stroke(self, whiteboard_id: WhiteboardId) -> Option<Stroke> {
        Stroke::from_parts(
            self.id.unwrap_or_default(),
            whiteboard_id,
            self.user_id,
            self.points,
            StrokeStyle::new(self.color, self.thickness),
        )
    }
}

impl From<&Stroke> for StrokePayload {
    fn from(stroke: &Stroke) -> Self {
        Self {
            id: Some(stroke.id()),
            points: stroke.points().to_vec(),
            color: stroke.style().color().to_string(),
            thickness: stroke.style().thickness,
            user_id: stroke.author_id().clone(),
        }
    }
}

/// Messages sent to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a whiteboard's topic
    Join { whiteboard: WhiteboardId },
    /// Leave the current topic
    Leave,
    /// Publish a finalized stroke
    Stroke { stroke: StrokePayload },
}

/// Messages received from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm topic join
    Joined { whiteboard: WhiteboardId, peer_count: usize },
    /// Peer joined the topic
    PeerJoined { peer_id: String },
    /// Peer left the topic
    PeerLeft { peer_id: String },
    /// Stroke published by another peer
    Stroke { from: String, stroke: StrokePayload },
    /// Error message
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_field_names() {
        let payload = StrokePayload {
            id: Some(StrokeId::new()),
            points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            color: "hsl(97, 70%, 50%)".into(),
            thickness: 3.0,
            user_id: UserId::new("alice"),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["userId"], "alice");
        assert_eq!(value["points"][0]["x"], 1.0);
        assert_eq!(value["points"][1]["y"], 4.0);
        assert_eq!(value["thickness"], 3.0);
    }

    #[test]
    fn test_payload_defaults() {
        let json = r##"{"points":[{"x":0,"y":0},{"x":5,"y":5}],"color":"#ff0000","userId":"bob"}"##;
        let payload: StrokePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.thickness, DEFAULT_THICKNESS);
        assert!(payload.id.is_none());

        let stroke = payload.into_stroke(WhiteboardId::new()).unwrap();
        assert_eq!(stroke.author_id().as_str(), "bob");
        assert_eq!(stroke.style().color(), "#ff0000");
    }

    #[test]
    fn test_short_payload_is_dropped() {
        let json = r##"{"points":[{"x":0,"y":0}],"color":"#000","userId":"bob"}"##;
        let payload: StrokePayload = serde_json::from_str(json).unwrap();
        assert!(payload.into_stroke(WhiteboardId::new()).is_none());
    }

    #[test]
    fn test_payload_without_style_or_id_gets_defaults() {
        let json = r#"{"points":[{"x":1,"y":1},{"x":2,"y":3}],"userId":"carol"}"#;
        let payload: StrokePayload = serde_json::from_str(json).unwrap();
        let whiteboard = WhiteboardId::new();

        let first = payload.clone().into_stroke(whiteboard).unwrap();
        let second = payload.into_stroke(whiteboard).unwrap();
        assert_eq!(first.style().color(), "#000000");
        assert_eq!(first.style().thickness, DEFAULT_THICKNESS);
        assert_eq!(first.whiteboard_id(), whiteboard);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_payload_keeps_sender_id() {
        let id = StrokeId::new();
        let json = format!(r##"{{"id":"{}","points":[{{"x":0,"y":0}},{{"x":1,"y":0}}],"color":"#00ff00","thickness":5,"userId":"dave"}}"##, id);
        let stroke = serde_json::from_str::<StrokePayload>(&json)
            .unwrap()
            .into_stroke(WhiteboardId::new())
            .unwrap();
        assert_eq!(stroke.id(), id);
        assert_eq!(stroke.style().thickness, 5.0);
    }

    #[test]
    fn test_client_message_serialize() {
        let whiteboard = WhiteboardId::new();
        let msg = ClientMessage::Join { whiteboard };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"join""#));
        assert!(json.contains(&whiteboard.to_string()));
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r##"{"type":"stroke","from":"peer-1","stroke":{"id":"6f1d0a52-3c9b-4d5e-8f10-2a3b4c5d6e7f","points":[{"x":0,"y":0},{"x":1,"y":1}],"color":"#000","thickness":2,"userId":"u"}}"##;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::Stroke { from, stroke } => {
                assert_eq!(from, "peer-1");
                assert_eq!(stroke.thickness, 2.0);
                assert_eq!(stroke.points.len(), 2);
            }
            _ => panic!("Wrong message type"),
        }
    }
}
