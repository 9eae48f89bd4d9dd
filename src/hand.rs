//! Hand landmark sets and finger counting.
//!
//! Landmarks follow the 21-point MediaPipe hand topology with coordinates
//! normalized to the frame (`x` to the right, `y` downwards, both in `0..=1`).

use crate::error::Error;
use nalgebra as na;

pub const NUM_LANDMARKS: usize = 21;

/// Finger tip landmarks, thumb first.
pub const TIPS: [LandmarkIdx; 5] = [
    LandmarkIdx::ThumbTip,
    LandmarkIdx::IndexFingerTip,
    LandmarkIdx::MiddleFingerTip,
    LandmarkIdx::RingFingerTip,
    LandmarkIdx::PinkyTip,
];

/// Names for the hand pose landmarks.
///
/// - **CMC**: carpometacarpal joint, the lowest joint of the thumb.
/// - **MCP**: metacarpophalangeal joint, the knuckles.
/// - **PIP** / **DIP**: proximal and distal interphalangeal joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

pub const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    landmarks: [na::Point3<f32>; NUM_LANDMARKS],
    pub handedness: Option<Handedness>,
}

impl Hand {
    pub fn new(landmarks: [na::Point3<f32>; NUM_LANDMARKS], handedness: Option<Handedness>) -> Self {
        Self {
            landmarks,
            handedness,
        }
    }

    /// Builds a hand from a flat `[x0, y0, z0, x1, ...]` slice.
    pub fn from_flat(coords: &[f32], handedness: Option<Handedness>) -> Result<Self, Error> {
        if coords.len() < NUM_LANDMARKS * 3 {
            return Err(Error::Landmarks(format!(
                "expected {} landmark coordinates, got {}",
                NUM_LANDMARKS * 3,
                coords.len()
            )));
        }

        let mut landmarks = [na::Point3::origin(); NUM_LANDMARKS];
        for (lm, xyz) in landmarks.iter_mut().zip(coords.chunks_exact(3)) {
            *lm = na::Point3::new(xyz[0], xyz[1], xyz[2]);
        }

        Ok(Self::new(landmarks, handedness))
    }

    #[inline]
    pub fn landmark(&self, idx: LandmarkIdx) -> &na::Point3<f32> {
        &self.landmarks[idx as usize]
    }

    #[inline]
    pub fn landmarks(&self) -> &[na::Point3<f32>] {
        &self.landmarks
    }

    /// Extension state of each finger, thumb first.
    ///
    /// The thumb tip is compared horizontally against the IP joint, with the
    /// direction depending on handedness (unknown handedness counts as right).
    /// Every other finger is extended when its tip lies above (smaller `y`) the
    /// PIP joint two landmarks further down the finger.
    pub fn fingers(&self) -> [bool; 5] {
        let mut fingers = [false; 5];

        let tip = self.landmarks[TIPS[0] as usize].x;
        let joint = self.landmarks[TIPS[0] as usize - 1].x;
        fingers[0] = match self.handedness.unwrap_or(Handedness::Right) {
            Handedness::Right => tip < joint,
            Handedness::Left => tip > joint,
        };

        for (finger, &tip) in fingers.iter_mut().zip(TIPS.iter()).skip(1) {
            let tip = tip as usize;
            *finger = self.landmarks[tip].y < self.landmarks[tip - 2].y;
        }

        fingers
    }

    pub fn finger_count(&self) -> usize {
        self.fingers().iter().filter(|f| **f).count()
    }
}

/// Detects hand landmark sets in a frame.
pub trait LandmarkDetector<F> {
    fn process(&mut self, frame: &F) -> Result<Vec<Hand>, Error>;
}
