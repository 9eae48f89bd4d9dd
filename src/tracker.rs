use crate::algorithm::Algorithm;
use crate::bbox::{BBox, Ltwh};
use crate::error::Error;

/// A single-object tracker instance provided by a vision library.
pub trait Tracker<F> {
    fn init(&mut self, frame: &F, bbox: &BBox<Ltwh>) -> Result<(), Error>;

    /// Returns the new box, or `None` when the algorithm lost the object.
    fn update(&mut self, frame: &F) -> Result<Option<BBox<Ltwh>>, Error>;
}

/// Constructs tracker instances of a given kind.
pub trait TrackerBackend<F> {
    fn create(&self, algorithm: Algorithm) -> Result<Box<dyn Tracker<F>>, Error>;

    /// Creates and initializes a tracker in one go.
    fn start(
        &self,
        algorithm: Algorithm,
        frame: &F,
        bbox: &BBox<Ltwh>,
    ) -> Result<Box<dyn Tracker<F>>, Error> {
        let mut tracker = self.create(algorithm)?;
        tracker.init(frame, bbox)?;

        Ok(tracker)
    }
}

pub struct TrackedObject<F> {
    pub id: u32,
    pub algorithm: Algorithm,
    pub bbox: BBox<Ltwh>,
    pub lost: bool,
    tracker: Box<dyn Tracker<F>>,
}

impl<F> TrackedObject<F> {
    /// Runs one tracker update. A failed update keeps the last known box but
    /// flags the object as lost until the next successful update.
    pub fn update(&mut self, frame: &F) -> bool {
        match self.tracker.update(frame) {
            Ok(Some(bbox)) => {
                self.bbox = bbox;
                self.lost = false;
            }
            Ok(None) => {
                log::trace!("object {}: {} lost the target", self.id, self.algorithm);
                self.lost = true;
            }
            Err(err) => {
                log::warn!("object {}: {} update failed: {}", self.id, self.algorithm, err);
                self.lost = true;
            }
        }

        !self.lost
    }
}

impl<F> std::fmt::Debug for TrackedObject<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedObject")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("bbox", &self.bbox)
            .field("lost", &self.lost)
            .finish()
    }
}

/// Ordered collection of tracked objects.
///
/// In single-object mode a new selection replaces the current object, in
/// multi-object mode it is appended.
pub struct TrackedObjects<F> {
    multi: bool,
    next_id: u32,
    objects: Vec<TrackedObject<F>>,
}

impl<F> TrackedObjects<F> {
    pub fn new(multi: bool) -> Self {
        Self {
            multi,
            next_id: 0,
            objects: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject<F>> {
        self.objects.iter()
    }

    #[inline]
    pub fn lost(&self) -> usize {
        self.objects.iter().filter(|o| o.lost).count()
    }

    /// Starts tracking `bbox` on `frame`. Returns the new object id, or `None`
    /// when the selection is empty and nothing was changed.
    pub fn add<B: TrackerBackend<F>>(
        &mut self,
        backend: &B,
        algorithm: Algorithm,
        frame: &F,
        bbox: BBox<Ltwh>,
    ) -> Result<Option<u32>, Error> {
        if bbox.is_empty() {
            return Ok(None);
        }

        let tracker = backend.start(algorithm, frame, &bbox)?;
        let id = self.next_id;
        self.next_id += 1;

        if !self.multi {
            self.objects.clear();
        }

        self.objects.push(TrackedObject {
            id,
            algorithm,
            bbox,
            lost: false,
            tracker,
        });

        Ok(Some(id))
    }

    /// Updates every object on `frame`, returns the number of successful updates.
    pub fn update(&mut self, frame: &F) -> usize {
        if self.objects.is_empty() {
            log::debug!("no active trackers, skipping update");
            return 0;
        }

        self.objects
            .iter_mut()
            .map(|obj| obj.update(frame))
            .filter(|ok| *ok)
            .count()
    }

    /// Re-creates every object's tracker with `algorithm`, initialized at the
    /// object's most recent box. Objects whose re-creation fails keep running
    /// their previous tracker.
    pub fn switch<B: TrackerBackend<F>>(&mut self, backend: &B, algorithm: Algorithm, frame: &F) {
        for obj in self.objects.iter_mut() {
            match backend.start(algorithm, frame, &obj.bbox) {
                Ok(tracker) => {
                    obj.tracker = tracker;
                    obj.algorithm = algorithm;
                    obj.lost = false;
                }
                Err(err) => log::warn!(
                    "object {}: unable to switch to {}, keeping {}: {}",
                    obj.id,
                    algorithm,
                    obj.algorithm,
                    err
                ),
            }
        }
    }
}
