//! Error type for the preprocessor core. Hand-rolled rather than derived
//! with `thiserror`, matching the manual `Display`/`From` style used
//! elsewhere in this codebase's ancestry for small, closed error sets.

#[derive(Debug)]
pub enum PpError {
    /// Propagated I/O failure reading the top-level input or an `#include`d
    /// file that could not be opened at all (as opposed to "not found",
    /// which is a non-fatal diagnostic handled by the include directive).
    Io(std::io::Error),
    /// `#error msg` — the only directive that terminates the run.
    Fatal(String),
}

impl std::fmt::Display for PpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Fatal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PpError {}

impl From<std::io::Error> for PpError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

pub type PpResult<T> = Result<T, PpError>;
