use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Exposure dimensions differ from batch: expected {expected:?}, found {found:?}")]
    InputMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Radiance requested with no exposures in the batch")]
    EmptyBatch,

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(u32, u32),

    #[error("Invalid probe input: {0}")]
    InvalidProbeInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Frame capture failed: {0}")]
    CaptureError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
