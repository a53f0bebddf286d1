//! Canonical position normalization.
//!
//! Stored positions never drift from display order: every structural change
//! funnels through a full reindex of the affected container(s), so positions
//! are always the element's zero-based index. Gapped or duplicated positions
//! are tolerated only on ingest (`normalize`), never after a mutation.

use crate::domain::board::BoardState;
use crate::domain::task::ColumnId;

/// Reassigns each task in the column its zero-based index as `position`.
///
/// The column's `task_ids` sequence is the display order; this writes that
/// order back onto the task objects.
pub fn reindex_column(board: &mut BoardState, column_id: &ColumnId) {
    let Some(column) = board.columns.iter().find(|c| &c.id == column_id) else {
        return;
    };
    let ids: Vec<_> = column.task_ids.clone();
    for (index, task_id) in ids.iter().enumerate() {
        if let Some(task) = board.tasks.get_mut(task_id) {
            task.position = index as u32;
            task.column_id = column_id.clone();
        } else {
            tracing::warn!(task = %task_id, column = %column_id, "column references unknown task");
        }
    }
}

/// Reassigns each column its zero-based index as `position`.
pub fn reindex_columns(board: &mut BoardState) {
    for (index, column) in board.columns.iter_mut().enumerate() {
        column.position = index as u32;
    }
}

/// Brings a snapshot loaded from a backend into canonical form.
///
/// Columns are sorted by their stored position, tasks within each column by
/// theirs (ties broken by ID so the result is deterministic), and everything
/// is then reindexed to contiguous zero-based positions.
pub fn normalize(board: &mut BoardState) {
    board.columns.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });

    let column_ids: Vec<ColumnId> = board.columns.iter().map(|c| c.id.clone()).collect();
    for column_id in &column_ids {
        let column = board
            .columns
            .iter_mut()
            .find(|c| &c.id == column_id)
            .expect("column_ids was built from board.columns");
        let tasks = &board.tasks;
        column.task_ids.sort_by(|a, b| {
            let pa = tasks.get(a).map(|t| t.position).unwrap_or(u32::MAX);
            let pb = tasks.get(b).map(|t| t.position).unwrap_or(u32::MAX);
            pa.cmp(&pb).then_with(|| a.as_str().cmp(b.as_str()))
        });
        reindex_column(board, column_id);
    }

    reindex_columns(board);
}
