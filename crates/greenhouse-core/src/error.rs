//! Error types for controller operations

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The selected file does not declare an `image/*` media type
    #[error("Invalid file type: {media_type:?} is not an image")]
    InvalidFileType { media_type: String },
    /// Analysis was requested with no image uploaded
    #[error("No image selected")]
    NoImageSelected,
    /// A newer upload or a reset replaced this upload before it finished
    #[error("Upload superseded by a newer request")]
    Superseded,
    #[error("Invalid sector {0}, expected 1-3")]
    InvalidSector(u8),
    #[error("Invalid duration {0}s, expected 1-60")]
    InvalidDuration(u64),
    #[error("Invalid brightness {0}%, expected 0-100")]
    InvalidBrightness(u8),
    /// A background task panicked or could not be joined
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl ControlError {
    /// Message shown to the user for errors that surface as an alert
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ControlError::InvalidFileType { .. } => Some("Please select a valid image file."),
            ControlError::NoImageSelected => Some("Please upload an image first."),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
