use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImgprobeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("`{program}` timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },

    #[error("{0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, ImgprobeError>;
