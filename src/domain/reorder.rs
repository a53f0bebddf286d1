//! Reorder algorithms.
//!
//! Three pure operations over an immutable [`BoardState`] snapshot. Each
//! returns a new snapshot and never mutates its input; the affected
//! container(s) are fully reindexed before the snapshot is returned, so the
//! output always satisfies the position invariant.
//!
//! Index semantics: `from` addresses the element in the input sequence;
//! `to` addresses the slot in the sequence *after* removal. `to` equal to the
//! container length appends (stable insert-at-end, not an out-of-bounds
//! error); anything past that is rejected.

use crate::domain::board::BoardState;
use crate::domain::position::{reindex_column, reindex_columns};
use crate::domain::task::ColumnId;
use crate::error::{LanekitError, Result};

fn check_source(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(LanekitError::IndexOutOfRange { index, len });
    }
    Ok(())
}

fn check_dest(index: usize, len: usize) -> Result<()> {
    if index > len {
        return Err(LanekitError::IndexOutOfRange { index, len });
    }
    Ok(())
}

/// Moves the task at `from` to `to` within a single column.
///
/// Returns the input unchanged when `from == to`.
pub fn reorder_within_column(
    board: &BoardState,
    column_id: &ColumnId,
    from: usize,
    to: usize,
) -> Result<BoardState> {
    let column = board
        .find_column(column_id)
        .ok_or_else(|| LanekitError::ColumnNotFound(column_id.to_string()))?;
    let len = column.task_ids.len();
    check_source(from, len)?;
    check_dest(to, len)?;

    let mut next = board.clone();
    if from == to {
        return Ok(next);
    }

    let column = next
        .columns
        .iter_mut()
        .find(|c| &c.id == column_id)
        .expect("column presence checked above");
    let task_id = column.task_ids.remove(from);
    let slot = to.min(column.task_ids.len());
    column.task_ids.insert(slot, task_id);

    reindex_column(&mut next, column_id);
    Ok(next)
}

/// Moves the task at `source_index` in `source` to `dest_index` in `dest`.
///
/// Both affected columns are reindexed independently; the moved task is
/// re-tagged with the destination column. Degenerates to
/// [`reorder_within_column`] when source and destination are the same column.
pub fn move_between_columns(
    board: &BoardState,
    source: &ColumnId,
    dest: &ColumnId,
    source_index: usize,
    dest_index: usize,
) -> Result<BoardState> {
    if source == dest {
        return reorder_within_column(board, source, source_index, dest_index);
    }

    let source_column = board
        .find_column(source)
        .ok_or_else(|| LanekitError::ColumnNotFound(source.to_string()))?;
    let dest_column = board
        .find_column(dest)
        .ok_or_else(|| LanekitError::ColumnNotFound(dest.to_string()))?;
    check_source(source_index, source_column.task_ids.len())?;
    check_dest(dest_index, dest_column.task_ids.len())?;

    let mut next = board.clone();

    let source_column = next
        .columns
        .iter_mut()
        .find(|c| &c.id == source)
        .expect("column presence checked above");
    let task_id = source_column.task_ids.remove(source_index);

    let dest_column = next
        .columns
        .iter_mut()
        .find(|c| &c.id == dest)
        .expect("column presence checked above");
    let slot = dest_index.min(dest_column.task_ids.len());
    dest_column.task_ids.insert(slot, task_id);

    reindex_column(&mut next, source);
    reindex_column(&mut next, dest);
    Ok(next)
}

/// Moves the column at `from` to `to` in the board's display order.
///
/// Returns the input unchanged when `from == to`.
pub fn reorder_columns(board: &BoardState, from: usize, to: usize) -> Result<BoardState> {
    let len = board.columns.len();
    check_source(from, len)?;
    check_dest(to, len)?;

    let mut next = board.clone();
    if from == to {
        return Ok(next);
    }

    let column = next.columns.remove(from);
    let slot = to.min(next.columns.len());
    next.columns.insert(slot, column);

    reindex_columns(&mut next);
    Ok(next)
}
