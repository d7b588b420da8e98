use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the data pipeline. Every core operation reports one of
/// these synchronously; presentation (dialog, stderr) is the caller's job.
#[derive(Debug, Error)]
pub enum DataError {
    /// The file extension names neither a spreadsheet nor a delimited-text
    /// format. Raised before any content is read.
    #[error("unsupported file extension '.{extension}' for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The file content could not be decoded into rows and columns.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The requested label column does not exist in the table.
    #[error("label column '{0}' not found")]
    MissingLabelColumn(String),

    /// The operation requires rows or columns that do not exist.
    #[error("dataset has no rows or columns")]
    EmptyDataset,
}

impl DataError {
    /// Wrap any decode failure as a parse error for the given path.
    pub(crate) fn parse(path: &std::path::Path, message: impl ToString) -> Self {
        DataError::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = DataError::UnsupportedFormat {
            path: PathBuf::from("data.txt"),
            extension: "txt".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported file extension '.txt' for data.txt"
        );

        let err = DataError::MissingLabelColumn("Product".to_string());
        assert_eq!(err.to_string(), "label column 'Product' not found");
    }
}
