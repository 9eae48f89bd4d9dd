use opencv::{
    core::{self, Mat},
    highgui, imgproc,
    prelude::*,
};

use crate::bbox::{BBox, Ltwh};
use crate::error::Error;
use crate::hand::{Handedness, LandmarkIdx, CONNECTIVITY};
use crate::overlay::{HandMarker, Marker, Overlay};
use crate::session::Surface;

const BOX_COLOR: (f64, f64, f64) = (255.0, 0.0, 0.0);
const TEXT_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const FAILURE_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const BONE_COLOR: (f64, f64, f64) = (255.0, 255.0, 255.0);
const JOINT_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);

#[inline]
fn color(c: (f64, f64, f64)) -> core::Scalar {
    core::Scalar::new(c.0, c.1, c.2, 0.0)
}

fn draw_marker(frame: &mut Mat, marker: &Marker) -> opencv::Result<()> {
    let bbox = marker.bbox.clip(frame.cols() as f32, frame.rows() as f32);
    if bbox.is_empty() {
        return Ok(());
    }
    let rect = core::Rect::from(&bbox);

    imgproc::rectangle(frame, rect, color(BOX_COLOR), 2, imgproc::LINE_8, 0)?;

    imgproc::put_text(
        frame,
        &format!("{}", marker.id),
        core::Point::new(rect.x, rect.y - 6),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.5,
        color(BOX_COLOR),
        1,
        imgproc::LINE_AA,
        false,
    )?;

    Ok(())
}

fn draw_hand(frame: &mut Mat, marker: &HandMarker) -> opencv::Result<()> {
    let (w, h) = (frame.cols() as f32, frame.rows() as f32);
    let point = |idx: LandmarkIdx| {
        let lm = marker.hand.landmark(idx);
        core::Point::new((lm.x * w) as i32, (lm.y * h) as i32)
    };

    for &(a, b) in CONNECTIVITY {
        imgproc::line(
            frame,
            point(a),
            point(b),
            color(BONE_COLOR),
            2,
            imgproc::LINE_AA,
            0,
        )?;
    }

    for lm in marker.hand.landmarks() {
        imgproc::circle(
            frame,
            core::Point::new((lm.x * w) as i32, (lm.y * h) as i32),
            4,
            color(JOINT_COLOR),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
    }

    let label = match marker.hand.handedness {
        Some(Handedness::Left) => format!("L: {}", marker.fingers),
        Some(Handedness::Right) => format!("R: {}", marker.fingers),
        None => format!("{}", marker.fingers),
    };
    let wrist = point(LandmarkIdx::Wrist);

    imgproc::put_text(
        frame,
        &label,
        core::Point::new(wrist.x, wrist.y + 20),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.7,
        color(TEXT_COLOR),
        2,
        imgproc::LINE_AA,
        false,
    )?;

    Ok(())
}

fn draw_labels(frame: &mut Mat, overlay: &Overlay) -> opencv::Result<()> {
    for (idx, label) in overlay.labels().iter().enumerate() {
        let c = if label.alert {
            FAILURE_COLOR
        } else {
            TEXT_COLOR
        };

        imgproc::put_text(
            frame,
            &label.text,
            core::Point::new(10, 25 + 25 * idx as i32),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            color(c),
            2,
            imgproc::LINE_AA,
            false,
        )?;
    }

    Ok(())
}

/// A highgui window. Destroyed on drop.
pub struct Window {
    name: String,
}

impl Window {
    pub fn open<S: ToString>(name: S) -> Result<Self, Error> {
        let name = name.to_string();
        highgui::named_window(&name, highgui::WINDOW_AUTOSIZE)?;

        Ok(Self { name })
    }
}

impl Surface<Mat> for Window {
    fn present(&mut self, frame: &Mat, overlay: &Overlay) -> Result<(), Error> {
        let mut canvas = frame.try_clone()?;

        if let Some(hands) = &overlay.hands {
            for hand in hands {
                draw_hand(&mut canvas, hand)?;
            }
        }

        for marker in &overlay.markers {
            draw_marker(&mut canvas, marker)?;
        }

        draw_labels(&mut canvas, overlay)?;

        highgui::imshow(&self.name, &canvas)?;

        Ok(())
    }

    fn wait_key(&mut self, delay_ms: i32) -> Result<Option<i32>, Error> {
        let key = highgui::wait_key(delay_ms)?;

        Ok(if key < 0 { None } else { Some(key) })
    }

    fn select_region(&mut self, frame: &Mat) -> Result<BBox<Ltwh>, Error> {
        log::info!("select a region and press SPACE or ENTER, c cancels");
        let rect = highgui::select_roi(&self.name, frame, true, false, true)?;

        Ok(rect.into())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_window(&self.name) {
            log::warn!("failed to close window {}: {}", self.name, err);
        }
    }
}
