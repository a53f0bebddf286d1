//! Drag session state machine.
//!
//! Tracks one in-progress pointer gesture: `Idle -> Dragging -> Idle`, with
//! the drop either resolving into a [`MoveRequest`] or being cancelled.
//! Nothing here mutates board state and nothing here is ever sent to remote
//! peers; only the resolved request crosses into the update engine.

use crate::domain::task::ColumnId;
use crate::error::{LanekitError, Result};

/// What kind of element a gesture is dragging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Task,
    Column,
}

/// A slot the pointer is over: a position within a column, or a position in
/// the board's column sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropSlot {
    Task { column: ColumnId, index: usize },
    Column { index: usize },
}

impl DropSlot {
    fn kind(&self) -> DragKind {
        match self {
            Self::Task { .. } => DragKind::Task,
            Self::Column { .. } => DragKind::Column,
        }
    }
}

/// The resolved result of a completed drag gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveRequest {
    Task {
        source_column: ColumnId,
        source_index: usize,
        dest_column: ColumnId,
        dest_index: usize,
    },
    Column {
        from_index: usize,
        to_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DragState {
    Idle,
    Dragging { source: DropSlot, current: DropSlot },
}

/// Ephemeral state for one drag gesture
///
/// Owned by the UI layer driving it; consumed or discarded when the gesture
/// ends. Misuse (updating with no active gesture, starting a second gesture)
/// is a caller bug and fails fast.
#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl Default for DragState {
    fn default() -> Self {
        Self::Idle
    }
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Starts a gesture from the given slot
    pub fn begin(&mut self, source: DropSlot) -> Result<()> {
        if self.is_dragging() {
            return Err(LanekitError::DragInProgress);
        }
        self.state = DragState::Dragging {
            current: source.clone(),
            source,
        };
        Ok(())
    }

    /// Updates the hovered slot. Pure UI feedback; no board mutation.
    pub fn update(&mut self, slot: DropSlot) -> Result<()> {
        match &mut self.state {
            DragState::Idle => Err(LanekitError::NoActiveDrag),
            DragState::Dragging { source, current } => {
                if source.kind() != slot.kind() {
                    return Err(LanekitError::DragKindMismatch);
                }
                *current = slot;
                Ok(())
            }
        }
    }

    /// Ends the gesture over a valid target.
    ///
    /// Returns `None` when the drop resolves to the gesture's own source slot
    /// (a no-op; the session just returns to idle with no side effects).
    pub fn finish(&mut self) -> Result<Option<MoveRequest>> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => Err(LanekitError::NoActiveDrag),
            DragState::Dragging { source, current } => {
                if source == current {
                    return Ok(None);
                }
                let request = match (source, current) {
                    (
                        DropSlot::Task {
                            column: source_column,
                            index: source_index,
                        },
                        DropSlot::Task {
                            column: dest_column,
                            index: dest_index,
                        },
                    ) => MoveRequest::Task {
                        source_column,
                        source_index,
                        dest_column,
                        dest_index,
                    },
                    (
                        DropSlot::Column { index: from_index },
                        DropSlot::Column { index: to_index },
                    ) => MoveRequest::Column {
                        from_index,
                        to_index,
                    },
                    // update() rejects kind changes, so source/current kinds
                    // always agree here
                    _ => unreachable!("drag kind changed mid-gesture"),
                };
                Ok(Some(request))
            }
        }
    }

    /// Aborts the gesture (released outside a target, escape pressed).
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
