use crate::domain::board::Column;
use serde::{Deserialize, Serialize};

/// Result of a work-in-progress limit check
///
/// Purely advisory: a column over its limit renders a warning, the move that
/// put it there has already succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipStatus {
    pub exceeded: bool,
    pub count: usize,
    pub limit: Option<u32>,
}

/// Compares a column's task count to its configured WIP limit.
///
/// A limit of `None` or `Some(0)` means unconstrained.
pub fn check_limit(column: &Column) -> WipStatus {
    let count = column.task_ids.len();
    let limit = column.wip_limit.filter(|l| *l > 0);
    WipStatus {
        exceeded: limit.is_some_and(|l| count > l as usize),
        count,
        limit: column.wip_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskId;

    fn column_with_tasks(count: usize) -> Column {
        let mut column = Column::new("In Progress");
        for n in 0..count {
            column.task_ids.push(TaskId::new(n as u32 + 1));
        }
        column
    }

    #[test]
    fn test_limit_exceeded_scenario_c() {
        // wip_limit=2, third task arrives -> exceeded with count 3, limit 2
        let column = column_with_tasks(3).with_wip_limit(2);

        let status = check_limit(&column);

        assert_eq!(
            status,
            WipStatus {
                exceeded: true,
                count: 3,
                limit: Some(2),
            }
        );
    }

    #[test]
    fn test_at_limit_is_not_exceeded() {
        let column = column_with_tasks(2).with_wip_limit(2);
        assert!(!check_limit(&column).exceeded);
    }

    #[test]
    fn test_no_limit_is_unconstrained() {
        let column = column_with_tasks(50);
        let status = check_limit(&column);
        assert!(!status.exceeded);
        assert_eq!(status.count, 50);
        assert_eq!(status.limit, None);
    }

    #[test]
    fn test_zero_limit_is_unconstrained() {
        let column = column_with_tasks(50).with_wip_limit(0);
        let status = check_limit(&column);
        assert!(!status.exceeded);
        assert_eq!(status.limit, Some(0));
    }
}
