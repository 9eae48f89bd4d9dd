use opencv::{
    core::{Mat, Ptr, Rect},
    prelude::*,
    video,
};

#[cfg(feature = "contrib")]
use opencv::{core::Rect2d, tracking};

use crate::algorithm::Algorithm;
use crate::bbox::{BBox, Ltwh};
use crate::error::Error;
use crate::tracker::{Tracker, TrackerBackend};

/// Trackers built on the `cv::Tracker` interface.
enum Modern {
    Mil(Ptr<video::TrackerMIL>),
    #[cfg(feature = "contrib")]
    Csrt(Ptr<tracking::TrackerCSRT>),
    #[cfg(feature = "contrib")]
    Kcf(Ptr<tracking::TrackerKCF>),
}

impl Tracker<Mat> for Modern {
    fn init(&mut self, frame: &Mat, bbox: &BBox<Ltwh>) -> Result<(), Error> {
        let rect = Rect::from(bbox);

        match self {
            Modern::Mil(t) => t.init(frame, rect)?,
            #[cfg(feature = "contrib")]
            Modern::Csrt(t) => t.init(frame, rect)?,
            #[cfg(feature = "contrib")]
            Modern::Kcf(t) => t.init(frame, rect)?,
        }

        Ok(())
    }

    fn update(&mut self, frame: &Mat) -> Result<Option<BBox<Ltwh>>, Error> {
        let mut rect = Rect::default();

        let ok = match self {
            Modern::Mil(t) => t.update(frame, &mut rect)?,
            #[cfg(feature = "contrib")]
            Modern::Csrt(t) => t.update(frame, &mut rect)?,
            #[cfg(feature = "contrib")]
            Modern::Kcf(t) => t.update(frame, &mut rect)?,
        };

        Ok(if ok { Some(rect.into()) } else { None })
    }
}

/// Trackers only available through the `cv::legacy` interface.
#[cfg(feature = "contrib")]
enum Legacy {
    Boosting(Ptr<tracking::legacy_TrackerBoosting>),
    Tld(Ptr<tracking::legacy_TrackerTLD>),
    MedianFlow(Ptr<tracking::legacy_TrackerMedianFlow>),
    Mosse(Ptr<tracking::legacy_TrackerMOSSE>),
}

#[cfg(feature = "contrib")]
impl Tracker<Mat> for Legacy {
    fn init(&mut self, frame: &Mat, bbox: &BBox<Ltwh>) -> Result<(), Error> {
        let rect = Rect2d::from(bbox);

        let ok = match self {
            Legacy::Boosting(t) => t.init(frame, rect)?,
            Legacy::Tld(t) => t.init(frame, rect)?,
            Legacy::MedianFlow(t) => t.init(frame, rect)?,
            Legacy::Mosse(t) => t.init(frame, rect)?,
        };

        if !ok {
            return Err(Error::Tracker(format!(
                "initialization rejected for {:?}",
                bbox.as_slice()
            )));
        }

        Ok(())
    }

    fn update(&mut self, frame: &Mat) -> Result<Option<BBox<Ltwh>>, Error> {
        let mut rect = Rect2d::default();

        let ok = match self {
            Legacy::Boosting(t) => t.update(frame, &mut rect)?,
            Legacy::Tld(t) => t.update(frame, &mut rect)?,
            Legacy::MedianFlow(t) => t.update(frame, &mut rect)?,
            Legacy::Mosse(t) => t.update(frame, &mut rect)?,
        };

        Ok(if ok { Some(rect.into()) } else { None })
    }
}

/// Creates OpenCV tracker instances. Kinds missing from the linked OpenCV
/// build fail in [`TrackerBackend::create`] and are left out when probing.
#[derive(Debug, Default, Clone, Copy)]
pub struct CvTrackers;

impl CvTrackers {
    pub fn new() -> Self {
        Self
    }
}

impl TrackerBackend<Mat> for CvTrackers {
    fn create(&self, algorithm: Algorithm) -> Result<Box<dyn Tracker<Mat>>, Error> {
        let tracker: Box<dyn Tracker<Mat>> = match algorithm {
            Algorithm::Mil => Box::new(Modern::Mil(video::TrackerMIL::create_def()?)),

            #[cfg(feature = "contrib")]
            Algorithm::Csrt => Box::new(Modern::Csrt(tracking::TrackerCSRT::create_def()?)),
            #[cfg(feature = "contrib")]
            Algorithm::Kcf => Box::new(Modern::Kcf(tracking::TrackerKCF::create_def()?)),
            #[cfg(feature = "contrib")]
            Algorithm::Boosting => Box::new(Legacy::Boosting(
                tracking::legacy_TrackerBoosting::create_def()?,
            )),
            #[cfg(feature = "contrib")]
            Algorithm::Tld => Box::new(Legacy::Tld(tracking::legacy_TrackerTLD::create_def()?)),
            #[cfg(feature = "contrib")]
            Algorithm::MedianFlow => Box::new(Legacy::MedianFlow(
                tracking::legacy_TrackerMedianFlow::create_def()?,
            )),
            #[cfg(feature = "contrib")]
            Algorithm::Mosse => Box::new(Legacy::Mosse(tracking::legacy_TrackerMOSSE::create()?)),

            #[cfg(not(feature = "contrib"))]
            other => {
                return Err(Error::Tracker(format!(
                    "{} requires the `contrib` feature",
                    other
                )))
            }
        };

        Ok(tracker)
    }
}
