//! # Lanekit Core
//!
//! Core positioning and real-time sync engine for Lanekit kanban boards.
//!
//! This crate provides the ordering model and reorder algorithms for tasks
//! within columns and columns within a board, the drag-session state machine
//! that resolves pointer gestures into moves, the optimistic update engine
//! that commits moves locally before the backend acknowledges them, and the
//! sync adapter that keeps concurrently connected clients converged,
//! without any dependency on specific UI implementations or transports.

pub mod backend;
pub mod domain;
pub mod drag;
pub mod engine;
pub mod error;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use backend::{Backend, ColumnPatch};
pub use domain::{
    board::{BoardId, BoardState, Column},
    task::{ColumnId, Priority, Task, TaskId},
    wip::{check_limit, WipStatus},
};
pub use drag::{DragKind, DragSession, DropSlot, MoveRequest};
pub use engine::{BoardEngine, CommittedMove, RemoteOutcome};
pub use error::{LanekitError, Result};
pub use session::{BoardSession, MoveOutcome, WipReport};
pub use sync::{BoardChannel, ClientId, LocalChannel, MoveEvent, MoveEventKind};
