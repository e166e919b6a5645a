use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArenaError>;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("position ({x}, {y}) is outside the {width}x{height} map")]
    InvalidPosition {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error("an agent named '{0}' already exists")]
    DuplicateName(String),

    #[error("roster is sealed, membership cannot change during a run")]
    RosterSealed,

    #[error("unknown agent kind: {0}")]
    UnknownKind(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
