//! OpenCV implementations of the capture, display, tracker and landmark
//! capabilities.

mod capture;
mod hands;
mod trackers;
mod window;

pub use capture::VideoSource;
pub use hands::DnnHandDetector;
pub use trackers::CvTrackers;
pub use window::Window;
