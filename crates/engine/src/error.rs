use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config value outside its sane range (negative tolerance, etc.).
    ConfigValidation(String),
    /// A CORRECTED decision with no override field at all.
    EmptyCorrection { line_id: String },
    /// A decision references a line the document set does not contain.
    UnknownLine { line_id: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyCorrection { line_id } => {
                write!(f, "line '{line_id}': CORRECTED decision carries no override")
            }
            Self::UnknownLine { line_id } => {
                write!(f, "decision references unknown line '{line_id}'")
            }
        }
    }
}

impl std::error::Error for EngineError {}
