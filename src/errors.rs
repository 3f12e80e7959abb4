use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("Network Error: {0}")]
    TransientNetwork(String),

    #[error("VISCA Error: {message} (code {code:#04X})")]
    Protocol { code: u8, message: String },

    #[error("Capture Error: {0}")]
    Capture(String),

    #[error("Detection Error: {0}")]
    Detection(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("File I/O Error: {0}")]
    Io(String),

    #[error("Task Execution Error: {0}")]
    Task(String),
}

// Allow conversion from std::io::Error to AppError::Io
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Detection(err.to_string())
    }
}
