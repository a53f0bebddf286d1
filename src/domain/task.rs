use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Unique identifier for a task (e.g., LK1, LK2, LK100)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    // Default prefix for task IDs (could be made configurable in the future)
    const DEFAULT_PREFIX: &'static str = "LK";

    /// Creates a new TaskId from a counter
    pub fn new(counter: u32) -> Self {
        Self(format!("{}{}", Self::DEFAULT_PREFIX, counter))
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TaskId {
    type Err = crate::error::LanekitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Convert to uppercase for case-insensitive comparison
        let normalized = s.to_uppercase();
        let prefix = TaskId::DEFAULT_PREFIX;

        if normalized.starts_with(prefix) && normalized.len() > prefix.len() {
            // Verify the rest is a valid number
            if normalized[prefix.len()..].parse::<u32>().is_ok() {
                // Store the normalized (uppercase) form
                Ok(Self(normalized))
            } else {
                Err(crate::error::LanekitError::InvalidTaskId(s.to_string()))
            }
        } else {
            Err(crate::error::LanekitError::InvalidTaskId(s.to_string()))
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a column (a slug, e.g., "to-do", "in-progress")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnId(String);

impl ColumnId {
    /// Derives a column ID from a display name ("In Progress" -> "in-progress")
    pub fn from_name(name: &str) -> Self {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        // Collapse runs of '-' and trim the ends
        let mut out = String::with_capacity(slug.len());
        let mut prev_dash = true;
        for c in slug.chars() {
            if c == '-' {
                if !prev_dash {
                    out.push('-');
                }
                prev_dash = true;
            } else {
                out.push(c);
                prev_dash = false;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        Self(out)
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ColumnId {
    type Err = crate::error::LanekitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(crate::error::LanekitError::InvalidColumnId(s.to_string()))
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Normal => write!(f, "Normal"),
            Self::High => write!(f, "High"),
        }
    }
}

/// A kanban task
///
/// A task belongs to exactly one column (`column_id`); `position` is its
/// zero-based index within that column and is recomputed on every reorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub column_id: ColumnId,
    pub position: u32,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task with the given ID and title in the given column
    pub fn new(id: TaskId, title: String, column_id: ColumnId) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description: None,
            column_id,
            position: 0,
            priority: Priority::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the title
    pub fn set_title(&mut self, title: String) {
        self.title = title;
        self.updated_at = Utc::now();
    }

    /// Sets the description
    pub fn set_description(&mut self, description: String) {
        self.description = Some(description);
        self.updated_at = Utc::now();
    }

    /// Sets the priority
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
        self.updated_at = Utc::now();
    }
}
