//! The capture, track and display loop.

use std::time::Instant;

use crate::algorithm::{Algorithm, Registry};
use crate::bbox::{BBox, Ltwh};
use crate::command::Command;
use crate::config::Config;
use crate::error::Error;
use crate::frame_rate::FrameRate;
use crate::hand::{Hand, LandmarkDetector};
use crate::overlay::{HandMarker, Marker, Overlay};
use crate::tracker::{TrackedObjects, TrackerBackend};

/// A source of frames. `read` returns `None` once the stream is exhausted.
pub trait Capture {
    type Frame;

    fn read(&mut self) -> Result<Option<Self::Frame>, Error>;
}

/// The display side: shows annotated frames, polls the keyboard and runs the
/// interactive region selection.
pub trait Surface<F> {
    fn present(&mut self, frame: &F, overlay: &Overlay) -> Result<(), Error>;

    /// Waits at most `delay_ms` for a key press.
    fn wait_key(&mut self, delay_ms: i32) -> Result<Option<i32>, Error>;

    /// Blocks until the user has drawn a box on `frame`. An empty box means
    /// the selection was cancelled.
    fn select_region(&mut self, frame: &F) -> Result<BBox<Ltwh>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    EndOfStream,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Tracking,
    Stopped(Exit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub frames: u64,
    pub exit: Exit,
}

pub struct Session<C, D, B>
where
    C: Capture,
{
    config: Config,
    capture: C,
    surface: D,
    backend: B,
    hands: Option<Box<dyn LandmarkDetector<C::Frame>>>,
    registry: Registry,
    algorithm: Algorithm,
    objects: TrackedObjects<C::Frame>,
    frame_rate: FrameRate,
    frames: u64,
    stopped: Option<Exit>,
}

impl<C, D, B> Session<C, D, B>
where
    C: Capture,
    D: Surface<C::Frame>,
    B: TrackerBackend<C::Frame>,
{
    /// Asks the backend which algorithms it can build and resolves the
    /// configured tracker name against them.
    pub fn new(config: Config, capture: C, surface: D, backend: B) -> Result<Self, Error> {
        config.validate()?;

        let registry = Registry::discover(&backend);
        let algorithm = registry.resolve(&config.tracker)?;
        log::info!("using {} tracker", algorithm);

        Ok(Self {
            objects: TrackedObjects::new(config.multi),
            config,
            capture,
            surface,
            backend,
            hands: None,
            registry,
            algorithm,
            frame_rate: FrameRate::default(),
            frames: 0,
            stopped: None,
        })
    }

    pub fn with_hands(mut self, detector: Box<dyn LandmarkDetector<C::Frame>>) -> Self {
        self.hands = Some(detector);
        self
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn objects(&self) -> &TrackedObjects<C::Frame> {
        &self.objects
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn state(&self) -> State {
        match self.stopped {
            Some(exit) => State::Stopped(exit),
            None if self.objects.is_empty() => State::Idle,
            None => State::Tracking,
        }
    }

    pub fn run(&mut self) -> Result<Summary, Error> {
        loop {
            if let Some(exit) = self.step()? {
                log::info!("stopped after {} frames ({:?})", self.frames, exit);

                return Ok(Summary {
                    frames: self.frames,
                    exit,
                });
            }
        }
    }

    /// Runs one iteration, returns `Some` once the loop has stopped.
    pub fn step(&mut self) -> Result<Option<Exit>, Error> {
        if let Some(exit) = self.stopped {
            return Ok(Some(exit));
        }

        let frame = match self.capture.read()? {
            Some(frame) => frame,
            None => return Ok(Some(self.stop(Exit::EndOfStream))),
        };
        self.frames += 1;

        let hands = self.detect_hands(&frame);

        let started = Instant::now();
        self.objects.update(&frame);
        let fps = self.frame_rate.record(started.elapsed());

        let overlay = self.overlay(fps, hands);
        self.surface.present(&frame, &overlay)?;

        let key = self.surface.wait_key(self.config.wait_ms)?;
        match key.map(Command::from_key).unwrap_or(Command::Ignore) {
            Command::Quit => return Ok(Some(self.stop(Exit::Quit))),
            Command::Select => self.select(&frame)?,
            Command::Algorithm(index) => self.switch(index, &frame),
            Command::Ignore => (),
        }

        Ok(None)
    }

    fn stop(&mut self, exit: Exit) -> Exit {
        self.stopped = Some(exit);
        exit
    }

    fn detect_hands(&mut self, frame: &C::Frame) -> Option<Vec<Hand>> {
        let detector = self.hands.as_mut()?;

        match detector.process(frame) {
            Ok(hands) => Some(hands),
            Err(err) => {
                log::warn!("hand detection failed: {}", err);
                Some(Vec::new())
            }
        }
    }

    fn overlay(&self, fps: f64, hands: Option<Vec<Hand>>) -> Overlay {
        Overlay {
            markers: self
                .objects
                .iter()
                .filter(|obj| !obj.lost)
                .map(|obj| Marker {
                    id: obj.id,
                    bbox: obj.bbox,
                })
                .collect(),
            algorithm: self.algorithm,
            fps,
            tracked: self.objects.len(),
            lost: self.objects.lost(),
            hands: hands.map(|hands| {
                hands
                    .into_iter()
                    .map(|hand| HandMarker {
                        fingers: hand.finger_count(),
                        hand,
                    })
                    .collect()
            }),
        }
    }

    fn select(&mut self, frame: &C::Frame) -> Result<(), Error> {
        let bbox = self.surface.select_region(frame)?;
        if bbox.is_empty() {
            log::debug!("region selection cancelled");
            return Ok(());
        }

        match self.objects.add(&self.backend, self.algorithm, frame, bbox) {
            Ok(Some(id)) => log::info!(
                "tracking object {} with {} at {:?}",
                id,
                self.algorithm,
                bbox.as_slice()
            ),
            Ok(None) => (),
            Err(err) => log::warn!("unable to start {} tracker: {}", self.algorithm, err),
        }

        Ok(())
    }

    fn switch(&mut self, index: usize, frame: &C::Frame) {
        let algorithm = match self.registry.get(index) {
            Some(alg) => alg,
            None => {
                log::warn!(
                    "no tracker bound to key {}, {} available",
                    index + 1,
                    self.registry.len()
                );
                return;
            }
        };

        log::info!("switching tracker {} -> {}", self.algorithm, algorithm);
        self.algorithm = algorithm;
        self.objects.switch(&self.backend, algorithm, frame);
    }
}
