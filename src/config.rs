use crate::error::Error;
use serde_derive::{Deserialize, Serialize};
use std::{fmt, fs::File, io::BufReader, path::Path, path::PathBuf, str::FromStr};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Camera(i32),
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Camera(idx) => write!(f, "camera #{}", idx),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `640x480`.
impl FromStr for Size {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidConfig(format!("expected WIDTHxHEIGHT, got `{}`", s));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;

        Ok(Size {
            width: w.trim().parse().map_err(|_| invalid())?,
            height: h.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Hand tracking settings: a palm detection model finds the hands, a
/// landmark model runs on a crop around each of them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HandConfig {
    /// Hand landmark model.
    pub model: PathBuf,
    pub presence_threshold: f32,
    /// Side of the square landmark model input, in pixels.
    pub input_size: u32,
    /// NHWC input layout instead of NCHW, for both models.
    pub channels_last: bool,
    pub landmarks_output: String,
    pub presence_output: String,
    pub handedness_output: String,

    /// Palm detection model.
    pub detection_model: PathBuf,
    /// Side of the square palm model input, a multiple of 16.
    pub detection_input_size: u32,
    pub detection_threshold: f32,
    /// Overlap above which the weaker of two palm detections is dropped.
    pub nms_threshold: f32,
    pub max_hands: usize,
    pub boxes_output: String,
    pub scores_output: String,
    /// Side of the landmark crop relative to the palm box.
    pub roi_scale: f32,
    /// Crop shift from the wrist towards the fingers, relative to the palm box.
    pub roi_shift: f32,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("hand_landmark.onnx"),
            presence_threshold: 0.5,
            input_size: 224,
            channels_last: false,
            landmarks_output: "Identity".to_string(),
            presence_output: "Identity_1".to_string(),
            handedness_output: "Identity_2".to_string(),
            detection_model: PathBuf::from("palm_detection.onnx"),
            detection_input_size: 192,
            detection_threshold: 0.5,
            nms_threshold: 0.3,
            max_hands: 2,
            boxes_output: "Identity".to_string(),
            scores_output: "Identity_1".to_string(),
            roi_scale: 2.6,
            roi_shift: 0.5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub source: Source,
    /// Tracker name, resolved against the available algorithms at startup.
    pub tracker: String,
    /// Capture size requested from the device.
    pub frame_size: Option<Size>,
    /// Every frame is resized to this before tracking and display.
    pub resize: Option<Size>,
    pub multi: bool,
    pub window: String,
    /// Key wait per frame, in milliseconds.
    pub wait_ms: i32,
    pub hands: Option<HandConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: Source::Camera(0),
            tracker: "kcf".to_string(),
            frame_size: None,
            resize: None,
            multi: false,
            window: "roitrack".to_string(),
            wait_ms: 1,
            hands: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        // 0 would make the key wait block until a key is pressed
        if self.wait_ms < 1 {
            return Err(Error::InvalidConfig(format!(
                "wait_ms must be at least 1, got {}",
                self.wait_ms
            )));
        }

        for (name, size) in [("frame_size", self.frame_size), ("resize", self.resize)] {
            if let Some(size) = size {
                if size.width == 0 || size.height == 0 {
                    return Err(Error::InvalidConfig(format!(
                        "{} must not be zero, got {}x{}",
                        name, size.width, size.height
                    )));
                }
            }
        }

        if let Some(hands) = &self.hands {
            if hands.input_size == 0 {
                return Err(Error::InvalidConfig("hands.input_size must not be zero".into()));
            }

            if hands.detection_input_size == 0 || hands.detection_input_size % 16 != 0 {
                return Err(Error::InvalidConfig(format!(
                    "hands.detection_input_size must be a nonzero multiple of 16, got {}",
                    hands.detection_input_size
                )));
            }

            for (name, value) in [
                ("presence_threshold", hands.presence_threshold),
                ("detection_threshold", hands.detection_threshold),
                ("nms_threshold", hands.nms_threshold),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(Error::InvalidConfig(format!(
                        "hands.{} must be within 0..=1, got {}",
                        name, value
                    )));
                }
            }

            if hands.max_hands == 0 {
                return Err(Error::InvalidConfig("hands.max_hands must not be zero".into()));
            }

            if hands.roi_scale.is_nan() || hands.roi_scale <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "hands.roi_scale must be positive, got {}",
                    hands.roi_scale
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::from_json("{}").unwrap();

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.source, Source::Camera(0));
        assert_eq!(cfg.tracker, "kcf");
    }

    #[test]
    fn full_config() {
        let cfg = Config::from_json(
            r#"{
                "source": { "file": "clip.mp4" },
                "tracker": "csrt",
                "frame_size": { "width": 1280, "height": 720 },
                "resize": { "width": 640, "height": 360 },
                "multi": true,
                "hands": { "model": "hands.onnx", "channels_last": true }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.source, Source::File("clip.mp4".into()));
        assert_eq!(cfg.resize, Some(Size::new(640, 360)));
        assert!(cfg.multi);

        let hands = cfg.hands.unwrap();
        assert_eq!(hands.model, PathBuf::from("hands.onnx"));
        assert!(hands.channels_last);
        assert_eq!(hands.input_size, 224);
        assert_eq!(hands.detection_model, PathBuf::from("palm_detection.onnx"));
        assert_eq!(hands.detection_input_size, 192);
        assert_eq!(hands.max_hands, 2);
    }

    #[test]
    fn rejects_bad_palm_settings() {
        for json in [
            r#"{ "hands": { "detection_input_size": 100 } }"#,
            r#"{ "hands": { "detection_threshold": 1.5 } }"#,
            r#"{ "hands": { "nms_threshold": -0.1 } }"#,
            r#"{ "hands": { "max_hands": 0 } }"#,
            r#"{ "hands": { "roi_scale": 0.0 } }"#,
        ] {
            assert!(
                matches!(Config::from_json(json), Err(Error::InvalidConfig(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn rejects_blocking_wait() {
        assert!(matches!(
            Config::from_json(r#"{ "wait_ms": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_size() {
        assert!(Config::from_json(r#"{ "resize": { "width": 0, "height": 10 } }"#).is_err());
    }

    #[test]
    fn parse_size() {
        assert_eq!("640x480".parse::<Size>().unwrap(), Size::new(640, 480));
        assert_eq!(" 320 X 240 ".parse::<Size>().unwrap(), Size::new(320, 240));
        assert!("640".parse::<Size>().is_err());
        assert!("axb".parse::<Size>().is_err());
    }
}
