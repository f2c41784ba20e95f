use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ElytraError {
    IoError(std::io::Error),
    /// The legacy chunk violates a structural precondition (array length, section Y, tag type).
    MalformedChunk(String),
}

impl ElytraError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ElytraError::MalformedChunk(msg.into())
    }
}

impl fmt::Display for ElytraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElytraError::IoError(err) => write!(f, "IO error: {}", err),
            ElytraError::MalformedChunk(msg) => write!(f, "Malformed chunk: {}", msg),
        }
    }
}

impl Error for ElytraError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ElytraError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ElytraError {
    fn from(err: std::io::Error) -> Self {
        ElytraError::IoError(err)
    }
}
