/// Error type shared by map loading, config loading and the field dispatcher.
///
/// Precondition failures (a door without collision pressure, a jump with an
/// occupied landing tile) are not errors: they are silent no-ops. Only data
/// problems and failed map mounts surface here.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("map `{map}`: {reason}")]
    InvalidMap { map: String, reason: String },

    #[error("map `{map}`: door at ({x},{y}) has unusable tileset metadata: {reason}")]
    DoorMetadata {
        map: String,
        x: i32,
        y: i32,
        reason: String,
    },

    #[error("map `{map}`: door at ({x},{y}) leads nowhere: {reason}")]
    BrokenDoor {
        map: String,
        x: i32,
        y: i32,
        reason: String,
    },

    #[error("unknown map `{0}`")]
    UnknownMap(String),

    #[error("failed to mount map `{map}`: {source}")]
    MountFailed {
        map: String,
        #[source]
        source: Box<FieldError>,
    },
}

impl FieldError {
    pub fn invalid_map(map: &str, reason: impl Into<String>) -> Self {
        FieldError::InvalidMap { map: map.to_string(), reason: reason.into() }
    }
}

pub type FieldResult<T> = Result<T, FieldError>;
