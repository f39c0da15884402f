use thiserror::Error;

/// Problems with one sheet of the workbook. Kept as strings so a failed
/// sheet can be stored and reported again each time it is selected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkbookError {
    #[error("Sheet '{0}' not found in workbook")]
    MissingSheet(String),
    #[error("Column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },
    #[error("Error parsing sheet '{sheet}': {message}")]
    Malformed { sheet: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinError {
    #[error("Year '{year}' not found in sheet '{sheet}'")]
    MissingYear { sheet: String, year: String },
}

/// Recoverable failures of one dashboard interaction. None of these are
/// fatal; the caller shows the message and keeps its previous rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error("No indicators listed in the index sheet.")]
    NoIndicators,
    #[error("Unknown indicator '{0}'.")]
    UnknownIndicator(String),
    #[error("No numeric year columns found in the selected sheet.")]
    NoYears { sheet: String },
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error(transparent)]
    Join(#[from] JoinError),
}
