use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Backend(String),

    #[error("Invalid image payload: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Artifact store error: {0}")]
    Io(#[from] std::io::Error),
}
