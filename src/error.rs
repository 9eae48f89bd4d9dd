use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[cfg(feature = "cv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config Error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unable to open video source {0}")]
    SourceUnavailable(String),

    #[error("no tracking algorithm is available in this build")]
    NoAlgorithms,

    #[error("unknown tracking algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("tracker error: {0}")]
    Tracker(String),

    #[error("landmark detector error: {0}")]
    Landmarks(String),
}
