use stackmap::jvm;
use std::fmt;
use std::io;

/// Ways tracing a listing can go wrong
#[derive(Debug)]
pub enum TraceError {
    Io(io::Error),

    /// Line of the listing could not be understood
    Syntax { line: usize, message: String },

    /// Frame tracking rejected a line of the listing
    Tracker { line: usize, error: jvm::Error },

    /// Instruction, label, or directive appeared before any `method` line
    NotInsideMethod { line: usize },
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> TraceError {
        TraceError::Io(err)
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Io(err) => write!(f, "IO - {}", err),
            TraceError::Syntax { line, message } => write!(f, "line {}: {}", line, message),
            TraceError::Tracker { line, error } => write!(f, "line {}: {}", line, error),
            TraceError::NotInsideMethod { line } => {
                write!(f, "line {}: not inside a method (missing `method` line)", line)
            }
        }
    }
}

impl std::error::Error for TraceError {}
