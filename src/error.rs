use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum TileSheetError {
    MissingResource {
        path: PathBuf,
        row: Option<usize>,
        message: String,
    },
    MalformedManifestRow {
        row: usize,
        reason: String,
    },
    DegenerateLayout(String),
    InvalidConfiguration(String),
    Codec(String),
    Io(std::io::Error),
}

impl TileSheetError {
    pub(crate) fn missing(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TileSheetError::MissingResource {
            path: path.into(),
            row: None,
            message: message.into(),
        }
    }

    /// Attaches a manifest row number to a resource error; other variants pass through.
    pub(crate) fn at_row(self, manifest_row: usize) -> Self {
        match self {
            TileSheetError::MissingResource { path, message, .. } => {
                TileSheetError::MissingResource {
                    path,
                    row: Some(manifest_row),
                    message,
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for TileSheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileSheetError::MissingResource { path, row, message } => match row {
                Some(row) => write!(
                    f,
                    "missing resource {} (manifest row {}): {}",
                    path.display(),
                    row,
                    message
                ),
                None => write!(f, "missing resource {}: {}", path.display(), message),
            },
            TileSheetError::MalformedManifestRow { row, reason } => {
                write!(f, "malformed manifest row {}: {}", row, reason)
            }
            TileSheetError::DegenerateLayout(message) => {
                write!(f, "degenerate layout: {}", message)
            }
            TileSheetError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            TileSheetError::Codec(message) => write!(f, "codec error: {}", message),
            TileSheetError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for TileSheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TileSheetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TileSheetError {
    fn from(value: std::io::Error) -> Self {
        TileSheetError::Io(value)
    }
}

impl From<image::ImageError> for TileSheetError {
    fn from(value: image::ImageError) -> Self {
        match value {
            image::ImageError::IoError(err) => TileSheetError::Io(err),
            other => TileSheetError::Codec(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resource_reports_row_when_attached() {
        let err = TileSheetError::missing("tokens/orc.png", "decode failed").at_row(7);
        let text = err.to_string();
        assert!(text.contains("tokens/orc.png"));
        assert!(text.contains("manifest row 7"));
    }

    #[test]
    fn at_row_leaves_other_variants_alone() {
        let err = TileSheetError::DegenerateLayout("cell width is 0".to_string()).at_row(3);
        assert_eq!(err.to_string(), "degenerate layout: cell width is 0");
    }
}
