use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};

use crate::config::{Size, Source};
use crate::error::Error;
use crate::session::Capture;

/// A camera or a video file. The device is released on drop.
pub struct VideoSource {
    cam: videoio::VideoCapture,
    resize: Option<Size>,
}

impl VideoSource {
    pub fn open(source: &Source, frame_size: Option<Size>, resize: Option<Size>) -> Result<Self, Error> {
        let mut cam = match source {
            Source::Camera(idx) => videoio::VideoCapture::new(*idx, videoio::CAP_ANY)?,
            Source::File(path) => {
                videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?
            }
        };

        if !videoio::VideoCapture::is_opened(&cam)? {
            return Err(Error::SourceUnavailable(source.to_string()));
        }

        // size hints only, devices are free to pick something else
        if let Some(size) = frame_size {
            cam.set(videoio::CAP_PROP_FRAME_WIDTH, size.width as f64)?;
            cam.set(videoio::CAP_PROP_FRAME_HEIGHT, size.height as f64)?;
        }

        let width = cam.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = cam.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        log::info!("opened {} at {}x{}", source, width, height);

        Ok(Self { cam, resize })
    }
}

impl Capture for VideoSource {
    type Frame = Mat;

    fn read(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();
        if !self.cam.read(&mut frame)? {
            return Ok(None);
        }

        if frame.cols() == 0 || frame.rows() == 0 {
            return Ok(None);
        }

        match self.resize {
            Some(size) => {
                let mut resized = Mat::default();
                imgproc::resize(
                    &frame,
                    &mut resized,
                    core::Size::new(size.width as i32, size.height as i32),
                    0.0,
                    0.0,
                    imgproc::INTER_LINEAR,
                )?;

                Ok(Some(resized))
            }
            None => Ok(Some(frame)),
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        if let Err(err) = self.cam.release() {
            log::warn!("failed to release video source: {}", err);
        }
    }
}
