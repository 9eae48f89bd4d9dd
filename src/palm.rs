//! Palm detection post-processing: SSD anchor decoding, non-maximum
//! suppression and the hand crop fed to the landmark model.

use nalgebra as na;

use crate::bbox::{BBox, Ltwh};
use crate::error::Error;

/// Values regressed per anchor: box centre offset, box size, then 7 keypoints.
pub const NUM_BOX_PARAMS: usize = 18;
pub const NUM_KEYPOINTS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

/// Anchor centre, normalized to the model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

/// Anchors of the palm model for a square input of `input_size` pixels:
/// 2 per cell of the stride 8 grid, then 6 per cell of the stride 16 grid.
pub fn anchors(input_size: u32) -> Vec<Anchor> {
    let mut anchors = Vec::new();

    for (stride, per_cell) in [(8, 2), (16, 6)] {
        let grid = (input_size / stride) as usize;

        for y in 0..grid {
            for x in 0..grid {
                let anchor = Anchor {
                    x: (x as f32 + 0.5) / grid as f32,
                    y: (y as f32 + 0.5) / grid as f32,
                };
                anchors.extend(std::iter::repeat(anchor).take(per_cell));
            }
        }
    }

    anchors
}

#[inline]
fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v.clamp(-100.0, 100.0)).exp())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Palm {
    pub score: f32,
    pub bbox: BBox<Ltwh>,
    pub keypoints: [na::Point2<f32>; NUM_KEYPOINTS],
}

impl Palm {
    #[inline]
    pub fn keypoint(&self, kp: Keypoint) -> na::Point2<f32> {
        self.keypoints[kp as usize]
    }

    fn scaled(&self, scale: f32) -> Palm {
        let b = self.bbox;

        Palm {
            score: self.score,
            bbox: BBox::ltwh(
                b.left() * scale,
                b.top() * scale,
                b.width() * scale,
                b.height() * scale,
            ),
            keypoints: self.keypoints.map(|p| na::Point2::new(p.x * scale, p.y * scale)),
        }
    }
}

/// Decodes the raw palm model outputs. `boxes` holds `NUM_BOX_PARAMS` values
/// per anchor, `scores` one logit per anchor. Returned palms are in input
/// pixels, in anchor order.
pub fn decode(
    boxes: &[f32],
    scores: &[f32],
    anchors: &[Anchor],
    input_size: u32,
    threshold: f32,
) -> Result<Vec<Palm>, Error> {
    if scores.len() != anchors.len() || boxes.len() != anchors.len() * NUM_BOX_PARAMS {
        return Err(Error::Landmarks(format!(
            "palm outputs do not match {} anchors: {} box values, {} scores",
            anchors.len(),
            boxes.len(),
            scores.len()
        )));
    }

    let size = input_size as f32;

    let palms = anchors
        .iter()
        .zip(scores)
        .zip(boxes.chunks_exact(NUM_BOX_PARAMS))
        .filter_map(|((anchor, &logit), params)| {
            let score = sigmoid(logit);
            if score < threshold {
                return None;
            }

            let (ax, ay) = (anchor.x * size, anchor.y * size);
            let (xc, yc, w, h) = (params[0] + ax, params[1] + ay, params[2], params[3]);

            let mut keypoints = [na::Point2::origin(); NUM_KEYPOINTS];
            for (kp, xy) in keypoints.iter_mut().zip(params[4..].chunks_exact(2)) {
                *kp = na::Point2::new(xy[0] + ax, xy[1] + ay);
            }

            Some(Palm {
                score,
                bbox: BBox::ltwh(xc - w / 2.0, yc - h / 2.0, w, h),
                keypoints,
            })
        })
        .collect();

    Ok(palms)
}

/// Non-maximum suppression: keeps the most confident palm of every group
/// overlapping by at least `iou_threshold`, at most `max` of them, most
/// confident first.
pub fn suppress(mut palms: Vec<Palm>, iou_threshold: f32, max: usize) -> Vec<Palm> {
    palms.sort_unstable_by(|a, b| a.score.total_cmp(&b.score));

    let mut kept = Vec::new();
    while let Some(seed) = palms.pop() {
        if kept.len() == max {
            break;
        }

        palms.retain(|other| seed.bbox.iou(&other.bbox) < iou_threshold);
        kept.push(seed);
    }

    kept
}

/// The frame padded on the right or at the bottom to a square, then scaled
/// to the palm model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    width: u32,
    height: u32,
    input_size: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, input_size: u32) -> Self {
        Self {
            width,
            height,
            input_size,
        }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.width.max(self.height)
    }

    #[inline]
    pub fn pad_right(&self) -> u32 {
        self.side() - self.width
    }

    #[inline]
    pub fn pad_bottom(&self) -> u32 {
        self.side() - self.height
    }

    /// Maps a palm found on the model input back to frame pixels.
    pub fn to_frame(&self, palm: &Palm) -> Palm {
        palm.scaled(self.side() as f32 / self.input_size as f32)
    }
}

/// Square crop around the whole hand in frame pixels: the palm box grown to
/// `scale` times its longer side, moved `shift` box heights from the wrist
/// towards the middle finger. Clipped to the frame and snapped to whole
/// pixels. Empty when the palm lies outside the frame.
pub fn hand_roi(palm: &Palm, scale: f32, shift: f32, width: u32, height: u32) -> BBox<Ltwh> {
    let b = palm.bbox;
    let up = (palm.keypoint(Keypoint::MiddleFingerMcp) - palm.keypoint(Keypoint::Wrist))
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| -na::Vector2::y());

    let center = na::Point2::new(b.left() + b.width() / 2.0, b.top() + b.height() / 2.0)
        + up * shift * b.height();
    let side = b.width().max(b.height()) * scale;

    let (w, h) = (width as f32, height as f32);
    let r = BBox::ltwh(center.x - side / 2.0, center.y - side / 2.0, side, side)
        .clip(w, h)
        .as_ltrb();

    BBox::ltrb(
        r.left().floor(),
        r.top().floor(),
        r.right().ceil().min(w),
        r.bottom().ceil().min(h),
    )
    .as_ltwh()
}

/// Maps `x, y, z` landmarks regressed on a `roi` crop scaled to `input_size`
/// pixels into frame coordinates normalized to `0..=1`. Depth is scaled like
/// `x`.
pub fn landmarks_to_frame(
    coords: &[f32],
    roi: &BBox<Ltwh>,
    input_size: u32,
    width: u32,
    height: u32,
) -> Vec<f32> {
    let size = input_size as f32;
    let (w, h) = (width as f32, height as f32);

    coords
        .chunks_exact(3)
        .flat_map(|p| {
            [
                (roi.left() + p[0] / size * roi.width()) / w,
                (roi.top() + p[1] / size * roi.height()) / h,
                p[2] / size * roi.width() / w,
            ]
        })
        .collect()
}
