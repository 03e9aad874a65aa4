use std::fmt;

/// Everything that can go wrong with the files or the job description a user
/// supplies. Surfaced to the user as-is; there is no retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// No master product list was supplied.
    NoProductList,
    /// A file had no header row at all.
    EmptyFile { source: String },
    /// A file has no column that could serve as the product identifier.
    MissingIdentifierColumn { source: String },
    /// An explicitly requested column does not exist in the file.
    MissingColumn { source: String, column: String },
    /// The bytes of a file could not be parsed as a spreadsheet.
    Unreadable { source: String, message: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Job validation error (bad option value, empty path, etc.).
    ConfigValidation(String),
    /// A location name outside the fixed set.
    UnknownLocation(String),
    /// The same location was supplied twice.
    DuplicateLocation(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProductList => write!(f, "no product list provided"),
            Self::EmptyFile { source } => write!(f, "{source}: file has no header row"),
            Self::MissingIdentifierColumn { source } => {
                write!(f, "{source}: no identifier column found (expected e.g. 'Item Name', 'Title' or 'SKU')")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "{source}: missing column '{column}'")
            }
            Self::Unreadable { source, message } => write!(f, "{source}: cannot read file: {message}"),
            Self::ConfigParse(msg) => write!(f, "job file parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "job file validation error: {msg}"),
            Self::UnknownLocation(name) => {
                write!(f, "unknown location '{name}' (expected one of: {})", crate::model::Location::names().join(", "))
            }
            Self::DuplicateLocation(name) => write!(f, "location '{name}' supplied more than once"),
        }
    }
}

impl std::error::Error for InputError {}
