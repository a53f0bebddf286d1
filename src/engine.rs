//! Optimistic update engine.
//!
//! [`BoardEngine`] owns the local board state. A local drop commits
//! immediately (`commit`), producing a [`CommittedMove`] that carries the
//! pre-move snapshot for rollback and the [`MoveEvent`] to broadcast. Remote
//! events from other clients go through `apply_remote`, which runs the
//! identical reorder algorithm against the entity's current local location.

use crate::domain::board::{BoardId, BoardState};
use crate::domain::position::normalize;
use crate::domain::reorder::{move_between_columns, reorder_columns};
use crate::domain::task::ColumnId;
use crate::drag::MoveRequest;
use crate::error::{LanekitError, Result};
use crate::sync::{ClientId, MoveEvent, MoveEventKind};
use uuid::Uuid;

/// A locally committed move, ready to persist and broadcast
#[derive(Debug)]
pub struct CommittedMove {
    pub request: MoveRequest,
    pub event: MoveEvent,
    /// Columns whose task count or order changed; the WIP checker
    /// re-evaluates these.
    pub affected: Vec<ColumnId>,
    // Pre-move snapshot, restored on persistence failure
    snapshot: BoardState,
}

/// Result of applying a remote move event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The move was applied to local state
    Applied { affected: Vec<ColumnId> },
    /// The entity already sits at the event's destination (e.g. an
    /// at-least-once redelivery); nothing changed
    Redundant,
    /// The event references an entity this client doesn't know; local state
    /// is behind and the session should resync
    Stale,
}

pub struct BoardEngine {
    state: BoardState,
}

impl BoardEngine {
    /// Wraps a snapshot, normalizing it to canonical positions first
    pub fn new(mut state: BoardState) -> Self {
        normalize(&mut state);
        Self { state }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn board_id(&self) -> BoardId {
        self.state.id
    }

    /// Applies a resolved drag result to local state.
    ///
    /// Selects the reorder algorithm by request kind, replaces local state
    /// with the new snapshot, and returns the committed move. Returns
    /// `Ok(None)` when the request resolves to a no-op (nothing committed,
    /// nothing to persist or broadcast).
    pub fn commit(&mut self, origin: ClientId, request: MoveRequest) -> Result<Option<CommittedMove>> {
        let (next, kind, affected) = match &request {
            MoveRequest::Task {
                source_column,
                source_index,
                dest_column,
                dest_index,
            } => {
                if source_column == dest_column && source_index == dest_index {
                    return Ok(None);
                }
                let source = self
                    .state
                    .find_column(source_column)
                    .ok_or_else(|| LanekitError::ColumnNotFound(source_column.to_string()))?;
                let task_id = source
                    .task_ids
                    .get(*source_index)
                    .ok_or(LanekitError::IndexOutOfRange {
                        index: *source_index,
                        len: source.task_ids.len(),
                    })?
                    .clone();

                let next = move_between_columns(
                    &self.state,
                    source_column,
                    dest_column,
                    *source_index,
                    *dest_index,
                )?;
                let kind = MoveEventKind::Task {
                    id: task_id,
                    dest_column: dest_column.clone(),
                    dest_index: *dest_index,
                };
                let mut affected = vec![dest_column.clone()];
                if source_column != dest_column {
                    affected.push(source_column.clone());
                }
                (next, kind, affected)
            }
            MoveRequest::Column {
                from_index,
                to_index,
            } => {
                if from_index == to_index {
                    return Ok(None);
                }
                let column_id = self
                    .state
                    .columns
                    .get(*from_index)
                    .ok_or(LanekitError::IndexOutOfRange {
                        index: *from_index,
                        len: self.state.columns.len(),
                    })?
                    .id
                    .clone();

                let next = reorder_columns(&self.state, *from_index, *to_index)?;
                let kind = MoveEventKind::Column {
                    id: column_id,
                    dest_index: *to_index,
                };
                (next, kind, Vec::new())
            }
        };

        let event = MoveEvent {
            event_id: Uuid::new_v4(),
            origin,
            board: self.state.id,
            kind,
        };
        let snapshot = std::mem::replace(&mut self.state, next);
        tracing::debug!(event = %event.event_id, "committed local move");

        Ok(Some(CommittedMove {
            request,
            event,
            affected,
            snapshot,
        }))
    }

    /// Applies a persisted WIP-limit change to the local column.
    ///
    /// Configuration only: positions and ordering are untouched, so this
    /// does not go through the reorder algorithms.
    pub fn set_wip_limit(&mut self, column: &ColumnId, wip_limit: Option<u32>) -> Result<()> {
        let column = self
            .state
            .columns
            .iter_mut()
            .find(|c| &c.id == column)
            .ok_or_else(|| LanekitError::ColumnNotFound(column.to_string()))?;
        column.wip_limit = wip_limit;
        Ok(())
    }

    /// Restores the pre-move snapshot of a committed move.
    ///
    /// Called when the backend rejects the move; local state returns to the
    /// last known-good order.
    pub fn revert(&mut self, committed: CommittedMove) {
        tracing::warn!(event = %committed.event.event_id, "reverting optimistic move");
        self.state = committed.snapshot;
    }

    /// Applies a move event from another client.
    ///
    /// The entity's current location is resolved against local state, then
    /// the same algorithm that handled the sender's local drop runs here.
    /// Destination indices are clamped to the local container length so a
    /// racing event still converges (last writer wins) instead of being
    /// dropped.
    pub fn apply_remote(&mut self, event: &MoveEvent) -> Result<RemoteOutcome> {
        if event.board != self.state.id {
            return Err(LanekitError::BoardMismatch {
                event: event.board.to_string(),
                session: self.state.id.to_string(),
            });
        }

        match &event.kind {
            MoveEventKind::Task {
                id,
                dest_column,
                dest_index,
            } => {
                let Some((current_column, current_index)) = self.state.locate_task(id) else {
                    tracing::warn!(task = %id, "remote move for unknown task");
                    return Ok(RemoteOutcome::Stale);
                };
                let Some(dest) = self.state.find_column(dest_column) else {
                    tracing::warn!(column = %dest_column, "remote move for unknown column");
                    return Ok(RemoteOutcome::Stale);
                };

                if current_column == *dest_column && current_index == *dest_index {
                    return Ok(RemoteOutcome::Redundant);
                }

                let clamped = (*dest_index).min(dest.task_ids.len());
                let next = move_between_columns(
                    &self.state,
                    &current_column,
                    dest_column,
                    current_index,
                    clamped,
                )?;
                self.state = next;

                let mut affected = vec![dest_column.clone()];
                if current_column != *dest_column {
                    affected.push(current_column);
                }
                Ok(RemoteOutcome::Applied { affected })
            }
            MoveEventKind::Column { id, dest_index } => {
                let Some(from_index) = self.state.column_index(id) else {
                    tracing::warn!(column = %id, "remote move for unknown column");
                    return Ok(RemoteOutcome::Stale);
                };

                if from_index == *dest_index {
                    return Ok(RemoteOutcome::Redundant);
                }

                let clamped = (*dest_index).min(self.state.columns.len());
                let next = reorder_columns(&self.state, from_index, clamped)?;
                self.state = next;
                Ok(RemoteOutcome::Applied {
                    affected: Vec::new(),
                })
            }
        }
    }
}
