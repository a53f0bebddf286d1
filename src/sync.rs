//! Real-time sync adapter.
//!
//! Committed moves are broadcast as [`MoveEvent`]s over a channel scoped to
//! the board; every participant applies the identical reorder algorithm to
//! its own state, so co-present clients converge on the same reindexed
//! order. The channel delivers in send order per sender but gives no global
//! ordering across senders; concurrent moves on the same column resolve by
//! whichever event is applied last.

use crate::domain::board::BoardId;
use crate::domain::task::{ColumnId, TaskId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of a board room's broadcast channel.
/// Slow consumers lag, skip old events, and fall back to a full resync.
const ROOM_CAPACITY: usize = 256;

/// Identifies one connected client, so a session can skip events it
/// originated itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The semantic payload of a move event
///
/// Carries only the destination; each receiver resolves the entity's current
/// location in its own state before applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "lowercase")]
pub enum MoveEventKind {
    Task {
        id: TaskId,
        dest_column: ColumnId,
        dest_index: usize,
    },
    Column {
        id: ColumnId,
        dest_index: usize,
    },
}

/// A move committed by some client, broadcast to the board's room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvent {
    pub event_id: Uuid,
    pub origin: ClientId,
    pub board: BoardId,
    #[serde(flatten)]
    pub kind: MoveEventKind,
}

/// Real-time transport for a board's move events
///
/// Scoped per board: sessions join their board's room on open and leave on
/// close. Subscription is receiver-based: a subscriber sees every event
/// emitted after the `subscribe` call, including its own (filter on
/// [`MoveEvent::origin`]).
#[async_trait]
pub trait BoardChannel: Send + Sync {
    async fn join(&self, board: &BoardId) -> Result<()>;

    async fn leave(&self, board: &BoardId) -> Result<()>;

    async fn emit(&self, event: &MoveEvent) -> Result<()>;

    fn subscribe(&self, board: &BoardId) -> broadcast::Receiver<MoveEvent>;
}

/// In-process channel implementation
///
/// One broadcast sender per board room. Suitable for tests and single-process
/// deployments; a networked transport implements [`BoardChannel`] the same
/// way on top of its socket layer.
pub struct LocalChannel {
    rooms: Mutex<HashMap<BoardId, broadcast::Sender<MoveEvent>>>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn room(&self, board: &BoardId) -> broadcast::Sender<MoveEvent> {
        let mut rooms = self.rooms.lock().expect("room map poisoned");
        rooms
            .entry(*board)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .clone()
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoardChannel for LocalChannel {
    async fn join(&self, board: &BoardId) -> Result<()> {
        self.room(board);
        Ok(())
    }

    async fn leave(&self, board: &BoardId) -> Result<()> {
        let mut rooms = self.rooms.lock().expect("room map poisoned");
        if let Some(sender) = rooms.get(board) {
            if sender.receiver_count() == 0 {
                rooms.remove(board);
            }
        }
        Ok(())
    }

    async fn emit(&self, event: &MoveEvent) -> Result<()> {
        // send() errors only when there are 0 subscribers, which is fine.
        let _ = self.room(&event.board).send(event.clone());
        Ok(())
    }

    fn subscribe(&self, board: &BoardId) -> broadcast::Receiver<MoveEvent> {
        self.room(board).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn task_event(board: BoardId, origin: ClientId) -> MoveEvent {
        MoveEvent {
            event_id: Uuid::new_v4(),
            origin,
            board,
            kind: MoveEventKind::Task {
                id: TaskId::new(1),
                dest_column: ColumnId::from_str("done").unwrap(),
                dest_index: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let channel = LocalChannel::new();
        let board = BoardId::new();
        channel.join(&board).await.unwrap();

        let mut rx = channel.subscribe(&board);
        let event = task_event(board, ClientId::new());
        channel.emit(&event).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_rooms_are_scoped_per_board() {
        let channel = LocalChannel::new();
        let board_a = BoardId::new();
        let board_b = BoardId::new();

        let mut rx_b = channel.subscribe(&board_b);
        channel
            .emit(&task_event(board_a, ClientId::new()))
            .await
            .unwrap();

        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let channel = LocalChannel::new();
        let board = BoardId::new();
        channel
            .emit(&task_event(board, ClientId::new()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_leave_drops_empty_room() {
        let channel = LocalChannel::new();
        let board = BoardId::new();
        channel.join(&board).await.unwrap();

        channel.leave(&board).await.unwrap();

        assert!(channel.rooms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leave_keeps_room_with_subscribers() {
        let channel = LocalChannel::new();
        let board = BoardId::new();
        let _rx = channel.subscribe(&board);

        channel.leave(&board).await.unwrap();

        assert_eq!(channel.rooms.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = task_event(BoardId::new(), ClientId::new());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["entity"], "task");
        assert_eq!(json["id"], "LK1");
        assert_eq!(json["dest_column"], "done");
        assert_eq!(json["dest_index"], 0);
    }

    #[test]
    fn test_event_roundtrip() {
        let event = MoveEvent {
            event_id: Uuid::new_v4(),
            origin: ClientId::new(),
            board: BoardId::new(),
            kind: MoveEventKind::Column {
                id: ColumnId::from_str("to-do").unwrap(),
                dest_index: 2,
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: MoveEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
