use pagebox::LayoutError;

/// Errors raised while capturing, encoding or storing snapshots.
#[derive(Debug)]
pub enum SnapshotError {
    /// The captured tree failed its structural check.
    Layout(LayoutError),
    Json(serde_json::Error),
    Postcard(postcard::Error),
    Io(std::io::Error),
    /// Payload was written by an incompatible schema.
    Version { found: u8, expected: u8 },
    /// Stored payload exceeds the configured size limit.
    TooLarge { actual: usize, limit: usize },
}

impl core::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "snapshot capture failed: {}", err),
            Self::Json(err) => write!(f, "snapshot json error: {}", err),
            Self::Postcard(err) => write!(f, "snapshot postcard error: {}", err),
            Self::Io(err) => write!(f, "snapshot io error: {}", err),
            Self::Version { found, expected } => write!(
                f,
                "snapshot schema version {} is not supported (expected {})",
                found, expected
            ),
            Self::TooLarge { actual, limit } => write!(
                f,
                "snapshot payload too large (actual={} limit={})",
                actual, limit
            ),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Postcard(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Version { .. } | Self::TooLarge { .. } => None,
        }
    }
}

impl From<LayoutError> for SnapshotError {
    fn from(value: LayoutError) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<postcard::Error> for SnapshotError {
    fn from(value: postcard::Error) -> Self {
        Self::Postcard(value)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
