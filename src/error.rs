use std::path::PathBuf;

/// Reasons a single transcript file is skipped. None of these stop a batch.
#[derive(thiserror::Error, Debug)]
pub enum SheetError {
    #[error("unsupported file extension `{0}`")]
    UnsupportedExtension(String),
    #[error("could not open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {0} has no worksheets")]
    NoSheets(PathBuf),
    #[error("could not read worksheet `{sheet}`: {source}")]
    Range {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error("could not read CSV transcript: {0}")]
    Csv(#[from] csv::Error),
    #[error("transcript body has {found} columns, expected at least 6")]
    MissingColumns { found: usize },
}
