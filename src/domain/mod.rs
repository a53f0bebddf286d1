pub mod board;
pub mod position;
pub mod reorder;
pub mod task;
pub mod wip;

pub use board::{BoardId, BoardState, Column};
pub use position::{normalize, reindex_column, reindex_columns};
pub use reorder::{move_between_columns, reorder_columns, reorder_within_column};
pub use task::{ColumnId, Priority, Task, TaskId};
pub use wip::{check_limit, WipStatus};
