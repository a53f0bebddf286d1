use thiserror::Error;

pub type Result<T> = std::result::Result<T, LanekitError>;

#[derive(Debug, Error)]
pub enum LanekitError {
    #[error("Index {index} out of range for container of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("Invalid task ID format: {0}")]
    InvalidTaskId(String),

    #[error("Invalid column ID format: {0}")]
    InvalidColumnId(String),

    #[error("Event addressed to board {event} but session is on board {session}")]
    BoardMismatch { event: String, session: String },

    #[error("A drag gesture is already in progress")]
    DragInProgress,

    #[error("No drag gesture in progress")]
    NoActiveDrag,

    #[error("Drop target kind does not match the active drag")]
    DragKindMismatch,

    #[error("Board session is not loaded")]
    SessionNotLoaded,

    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("Realtime channel error: {0}")]
    Channel(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
