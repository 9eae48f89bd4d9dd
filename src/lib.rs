pub mod algorithm;
pub mod bbox;
pub mod command;
pub mod config;
pub mod error;
pub mod frame_rate;
pub mod hand;
pub mod overlay;
pub mod palm;
pub mod session;
pub mod tracker;

#[cfg(feature = "cv")]
pub mod cv;

pub use algorithm::{Algorithm, Registry};
pub use bbox::{BBox, Ltrb, Ltwh};
pub use config::Config;
pub use error::Error;
pub use hand::{Hand, Handedness, LandmarkDetector};
pub use overlay::{Label, Overlay};
pub use session::{Capture, Exit, Session, State, Summary, Surface};
pub use tracker::{TrackedObject, TrackedObjects, Tracker, TrackerBackend};
