use std::path::Path;

use opencv::{
    core::{self, Mat, Vector},
    dnn,
    prelude::*,
};

use crate::bbox::{BBox, Ltwh};
use crate::config::HandConfig;
use crate::error::Error;
use crate::hand::{Hand, Handedness, LandmarkDetector, NUM_LANDMARKS};
use crate::palm::{self, Anchor, Letterbox, Palm};

/// Two MediaPipe hand networks run through OpenCV DNN.
///
/// The palm detector sees the whole frame padded to a square. Each palm it
/// finds is grown into a crop around the whole hand, and the landmark network
/// runs on that crop: 21 landmarks in input pixels, a presence score and the
/// probability of the hand being a right hand. Both networks take RGB in
/// `0..=1`.
pub struct DnnHandDetector {
    palm_net: dnn::Net,
    palm_outputs: Vector<String>,
    anchors: Vec<Anchor>,
    landmark_net: dnn::Net,
    landmark_outputs: Vector<String>,
    config: HandConfig,
}

fn load(path: &Path) -> Result<dnn::Net, Error> {
    let model = path.to_string_lossy();
    let net = dnn::read_net_from_onnx(&model)?;

    if net.empty()? {
        return Err(Error::Landmarks(format!("unable to load {}", model)));
    }
    log::info!("loaded {}", model);

    Ok(net)
}

fn blob(image: &Mat, side: u32, channels_last: bool) -> Result<Mat, Error> {
    let side = side as i32;
    let blob = dnn::blob_from_image(
        image,
        1.0 / 255.0,
        core::Size::new(side, side),
        core::Scalar::default(),
        true,
        false,
        core::CV_32F,
    )?;

    if !channels_last {
        return Ok(blob);
    }

    let mut nhwc = Mat::default();
    core::transpose_nd(&blob, &Vector::from_slice(&[0, 2, 3, 1]), &mut nhwc)?;

    Ok(nhwc)
}

fn forward(net: &mut dnn::Net, input: &Mat, names: &Vector<String>) -> Result<Vector<Mat>, Error> {
    net.set_input(input, "", 1.0, core::Scalar::default())?;

    let mut outs = Vector::<Mat>::new();
    net.forward(&mut outs, names)?;

    if outs.len() != names.len() {
        return Err(Error::Landmarks(format!(
            "expected {} network outputs, got {}",
            names.len(),
            outs.len()
        )));
    }

    Ok(outs)
}

fn first_value(m: &Mat) -> Result<f32, Error> {
    m.data_typed::<f32>()?
        .first()
        .copied()
        .ok_or_else(|| Error::Landmarks("empty network output".into()))
}

impl DnnHandDetector {
    pub fn new(config: &HandConfig) -> Result<Self, Error> {
        let palm_net = load(&config.detection_model)?;
        let landmark_net = load(&config.model)?;

        let palm_outputs =
            Vector::from_iter([config.boxes_output.clone(), config.scores_output.clone()]);
        let landmark_outputs = Vector::from_iter([
            config.landmarks_output.clone(),
            config.presence_output.clone(),
            config.handedness_output.clone(),
        ]);

        Ok(Self {
            palm_net,
            palm_outputs,
            anchors: palm::anchors(config.detection_input_size),
            landmark_net,
            landmark_outputs,
            config: config.clone(),
        })
    }

    /// Palms in frame pixels, most confident first.
    fn detect_palms(&mut self, frame: &Mat) -> Result<Vec<Palm>, Error> {
        let cfg = &self.config;
        let letterbox = Letterbox::new(
            frame.cols() as u32,
            frame.rows() as u32,
            cfg.detection_input_size,
        );

        let mut square = Mat::default();
        core::copy_make_border(
            frame,
            &mut square,
            0,
            letterbox.pad_bottom() as i32,
            0,
            letterbox.pad_right() as i32,
            core::BORDER_CONSTANT,
            core::Scalar::default(),
        )?;

        let input = blob(&square, cfg.detection_input_size, cfg.channels_last)?;
        let outs = forward(&mut self.palm_net, &input, &self.palm_outputs)?;

        let palms = palm::decode(
            outs.get(0)?.data_typed::<f32>()?,
            outs.get(1)?.data_typed::<f32>()?,
            &self.anchors,
            cfg.detection_input_size,
            cfg.detection_threshold,
        )?;

        Ok(palm::suppress(palms, cfg.nms_threshold, cfg.max_hands)
            .iter()
            .map(|p| letterbox.to_frame(p))
            .collect())
    }

    /// Landmarks of the hand around `palm`, `None` when the landmark network
    /// finds no hand in the crop.
    fn hand(&mut self, frame: &Mat, palm: &Palm) -> Result<Option<Hand>, Error> {
        let cfg = &self.config;
        let (width, height) = (frame.cols() as u32, frame.rows() as u32);

        let roi: BBox<Ltwh> = palm::hand_roi(palm, cfg.roi_scale, cfg.roi_shift, width, height);
        if roi.is_empty() {
            return Ok(None);
        }

        let crop = Mat::roi(frame, core::Rect::from(&roi))?.try_clone()?;
        let input = blob(&crop, cfg.input_size, cfg.channels_last)?;
        let outs = forward(&mut self.landmark_net, &input, &self.landmark_outputs)?;

        let presence = first_value(&outs.get(1)?)?;
        if presence < cfg.presence_threshold {
            log::trace!("no hand in palm crop {:?}: presence {:.2}", roi.as_slice(), presence);
            return Ok(None);
        }

        let handedness = if first_value(&outs.get(2)?)? > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        let landmarks = outs.get(0)?;
        let raw = landmarks.data_typed::<f32>()?;
        let coords = palm::landmarks_to_frame(
            &raw[..raw.len().min(NUM_LANDMARKS * 3)],
            &roi,
            cfg.input_size,
            width,
            height,
        );

        Ok(Some(Hand::from_flat(&coords, Some(handedness))?))
    }
}

impl LandmarkDetector<Mat> for DnnHandDetector {
    fn process(&mut self, frame: &Mat) -> Result<Vec<Hand>, Error> {
        let palms = self.detect_palms(frame)?;

        let mut hands = Vec::with_capacity(palms.len());
        for palm in &palms {
            if let Some(hand) = self.hand(frame, palm)? {
                hands.push(hand);
            }
        }

        Ok(hands)
    }
}
