use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

use nalgebra as na;
use roitrack::hand::{LandmarkIdx, NUM_LANDMARKS};
use roitrack::{
    Algorithm, BBox, Capture, Config, Error, Exit, Hand, Handedness, LandmarkDetector, Ltwh,
    Overlay, Session, State, Surface, Tracker, TrackerBackend,
};

/// Collects log records so tests can assert on warnings. Tests run on
/// separate threads, each one only looks at its own records.
struct Records(Mutex<Vec<(ThreadId, log::Level, String)>>);

impl log::Log for Records {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut records) = self.0.lock() {
            records.push((thread::current().id(), record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static RECORDS: Records = Records(Mutex::new(Vec::new()));

fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&RECORDS).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
}

fn warnings() -> Vec<String> {
    let id = thread::current().id();
    RECORDS
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|(tid, level, _)| *tid == id && *level == log::Level::Warn)
        .map(|(_, _, msg)| msg.clone())
        .collect()
}

/// Frames are just their sequence number.
type Frame = u32;

struct Frames(VecDeque<Frame>);

impl Frames {
    fn new(count: u32) -> Self {
        Frames((1..=count).collect())
    }
}

impl Capture for Frames {
    type Frame = Frame;

    fn read(&mut self) -> Result<Option<Frame>, Error> {
        Ok(self.0.pop_front())
    }
}

#[derive(Default)]
struct Screen {
    /// Key pressed after each displayed frame, `None` for no key.
    keys: VecDeque<Option<char>>,
    selections: VecDeque<BBox<Ltwh>>,
    presented: Vec<(Frame, Overlay)>,
    selected_on: Vec<Frame>,
}

impl Screen {
    fn with_keys<I: IntoIterator<Item = Option<char>>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Default::default()
        }
    }

    fn select(mut self, bbox: BBox<Ltwh>) -> Self {
        self.selections.push_back(bbox);
        self
    }
}

impl Surface<Frame> for Screen {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<(), Error> {
        self.presented.push((*frame, overlay.clone()));
        Ok(())
    }

    fn wait_key(&mut self, delay_ms: i32) -> Result<Option<i32>, Error> {
        assert!(delay_ms > 0, "key wait must be bounded");
        Ok(self.keys.pop_front().flatten().map(|c| c as i32))
    }

    fn select_region(&mut self, frame: &Frame) -> Result<BBox<Ltwh>, Error> {
        self.selected_on.push(*frame);
        Ok(self
            .selections
            .pop_front()
            .unwrap_or_else(|| BBox::ltwh(0.0, 0.0, 0.0, 0.0)))
    }
}

/// Moves its box one pixel to the right every frame. Boxes starting at
/// `x >= 100` are never found again, boxes at `x >= 500` are refused by `init`.
struct Drift {
    bbox: Option<BBox<Ltwh>>,
    algorithm: Algorithm,
    inits: Rc<RefCell<Vec<(Algorithm, BBox<Ltwh>)>>>,
}

impl Tracker<Frame> for Drift {
    fn init(&mut self, _: &Frame, bbox: &BBox<Ltwh>) -> Result<(), Error> {
        if bbox.left() >= 500.0 {
            return Err(Error::Tracker("box outside of the frame".into()));
        }

        self.inits.borrow_mut().push((self.algorithm, *bbox));
        self.bbox = Some(*bbox);
        Ok(())
    }

    fn update(&mut self, _: &Frame) -> Result<Option<BBox<Ltwh>>, Error> {
        let b = self
            .bbox
            .ok_or_else(|| Error::Tracker("not initialized".into()))?;

        if b.left() >= 100.0 {
            return Ok(None);
        }

        let next = BBox::ltwh(b.left() + 1.0, b.top(), b.width(), b.height());
        self.bbox = Some(next);
        Ok(Some(next))
    }
}

#[derive(Clone)]
struct Backend {
    available: Vec<Algorithm>,
    inits: Rc<RefCell<Vec<(Algorithm, BBox<Ltwh>)>>>,
}

impl Backend {
    fn new(available: &[Algorithm]) -> Self {
        Self {
            available: available.to_vec(),
            inits: Default::default(),
        }
    }
}

impl TrackerBackend<Frame> for Backend {
    fn create(&self, algorithm: Algorithm) -> Result<Box<dyn Tracker<Frame>>, Error> {
        if !self.available.contains(&algorithm) {
            return Err(Error::Tracker(format!("{} not compiled in", algorithm)));
        }

        Ok(Box::new(Drift {
            bbox: None,
            algorithm,
            inits: self.inits.clone(),
        }))
    }
}

const ALL: &[Algorithm] = &Algorithm::ALL;

fn config(multi: bool) -> Config {
    Config {
        multi,
        ..Config::default()
    }
}

fn region() -> BBox<Ltwh> {
    BBox::ltwh(10.0, 10.0, 20.0, 20.0)
}

#[test]
fn three_frames_with_selection_on_the_first() {
    let screen = Screen::with_keys([Some('s'), None, None]).select(region());
    let mut session =
        Session::new(Config::default(), Frames::new(3), screen, Backend::new(ALL)).unwrap();

    let summary = session.run().unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.exit, Exit::EndOfStream);
    assert_eq!(session.state(), State::Stopped(Exit::EndOfStream));

    let presented = &session.surface().presented;
    assert_eq!(presented.len(), 3);
    assert_eq!(session.surface().selected_on, vec![1]);

    assert!(presented[0].1.markers.is_empty());
    assert_eq!(presented[1].1.markers.len(), 1);
    assert_eq!(presented[2].1.markers.len(), 1);
    assert_eq!(presented[1].1.markers[0].bbox.left(), 11.0);
    assert_eq!(presented[2].1.markers[0].bbox.left(), 12.0);
}

#[test]
fn quit_key_stops_immediately() {
    let screen = Screen::with_keys([None, Some('q')]);
    let mut session =
        Session::new(Config::default(), Frames::new(10), screen, Backend::new(ALL)).unwrap();

    let summary = session.run().unwrap();

    assert_eq!(summary.exit, Exit::Quit);
    assert_eq!(summary.frames, 2);
    assert_eq!(session.step().unwrap(), Some(Exit::Quit));
    assert_eq!(session.frames(), 2);
}

#[test]
fn idle_until_a_region_is_selected() {
    let screen = Screen::with_keys([None, Some('s')]).select(region());
    let mut session =
        Session::new(Config::default(), Frames::new(5), screen, Backend::new(ALL)).unwrap();

    assert_eq!(session.state(), State::Idle);
    session.step().unwrap();
    assert_eq!(session.state(), State::Idle);
    session.step().unwrap();
    assert_eq!(session.state(), State::Tracking);
}

#[test]
fn empty_selection_keeps_active_set() {
    let screen = Screen::with_keys([Some('s'), Some('s'), None])
        .select(region())
        .select(BBox::ltwh(50.0, 50.0, 0.0, 30.0));
    let backend = Backend::new(ALL);
    let inits = backend.inits.clone();
    let mut session = Session::new(config(true), Frames::new(3), screen, backend).unwrap();

    session.run().unwrap();

    assert_eq!(session.objects().len(), 1);
    assert_eq!(session.objects().iter().next().unwrap().id, 0);
    assert_eq!(inits.borrow().len(), 1);
}

#[test]
fn single_mode_replaces_and_multi_mode_appends() {
    let keys = [Some('s'), Some('s'), None];
    let second = BBox::ltwh(40.0, 40.0, 10.0, 10.0);

    let screen = Screen::with_keys(keys).select(region()).select(second);
    let mut single = Session::new(config(false), Frames::new(3), screen, Backend::new(ALL)).unwrap();
    single.run().unwrap();
    let ids: Vec<_> = single.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![1]);

    let screen = Screen::with_keys(keys).select(region()).select(second);
    let mut multi = Session::new(config(true), Frames::new(3), screen, Backend::new(ALL)).unwrap();
    multi.run().unwrap();
    let ids: Vec<_> = multi.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(multi.surface().presented[2].1.markers.len(), 2);
}

#[test]
fn switching_keeps_the_most_recent_box() {
    // select on frame 1, updates on 2 and 3, switch to the first algorithm on 3
    let screen = Screen::with_keys([Some('s'), None, Some('1'), None]).select(region());
    let backend = Backend::new(ALL);
    let inits = backend.inits.clone();
    let mut session = Session::new(Config::default(), Frames::new(4), screen, backend).unwrap();
    assert_eq!(session.algorithm(), Algorithm::Kcf);

    session.run().unwrap();

    assert_eq!(session.algorithm(), Algorithm::Csrt);

    let inits = inits.borrow();
    assert_eq!(inits.len(), 2);
    assert_eq!(inits[0], (Algorithm::Kcf, region()));
    assert_eq!(inits[1].0, Algorithm::Csrt);
    assert_eq!(inits[1].1.left(), 12.0);

    let obj = session.objects().iter().next().unwrap();
    assert_eq!(obj.algorithm, Algorithm::Csrt);
    assert_eq!(obj.bbox.left(), 13.0);

    let last = &session.surface().presented[3].1;
    assert_eq!(last.algorithm, Algorithm::Csrt);
    assert_eq!(last.labels()[0].text, "Tracker: CSRT");
}

#[test]
fn digit_beyond_available_count_is_ignored() {
    capture_logs();
    let screen = Screen::with_keys([Some('s'), Some('3'), Some('9')]).select(region());
    let backend = Backend::new(&[Algorithm::Kcf, Algorithm::Mil]);
    let inits = backend.inits.clone();
    let mut session = Session::new(Config::default(), Frames::new(3), screen, backend).unwrap();

    assert_eq!(session.registry().len(), 2);
    let summary = session.run().unwrap();

    assert_eq!(summary.exit, Exit::EndOfStream);
    assert_eq!(session.algorithm(), Algorithm::Kcf);
    assert_eq!(inits.borrow().len(), 1);

    let warned = warnings();
    assert!(warned.contains(&"no tracker bound to key 3, 2 available".to_string()));
    assert!(warned.contains(&"no tracker bound to key 9, 2 available".to_string()));
}

#[test]
fn rejected_init_keeps_the_tracked_object() {
    capture_logs();
    let screen = Screen::with_keys([Some('s'), Some('s'), None, None])
        .select(region())
        .select(BBox::ltwh(600.0, 10.0, 20.0, 20.0));
    let backend = Backend::new(ALL);
    let inits = backend.inits.clone();
    let mut session = Session::new(config(false), Frames::new(4), screen, backend).unwrap();

    let summary = session.run().unwrap();

    assert_eq!(summary.exit, Exit::EndOfStream);
    assert_eq!(summary.frames, 4);
    assert_eq!(session.state(), State::Stopped(Exit::EndOfStream));
    assert_eq!(session.surface().selected_on, vec![1, 2]);
    assert_eq!(inits.borrow().len(), 1);

    assert_eq!(session.objects().len(), 1);
    let obj = session.objects().iter().next().unwrap();
    assert_eq!(obj.id, 0);
    assert!(!obj.lost);
    assert_eq!(obj.bbox.left(), 13.0);

    assert!(warnings()
        .iter()
        .any(|w| w.starts_with("unable to start KCF tracker")));
}

#[test]
fn digit_keys_follow_registry_order() {
    let screen = Screen::with_keys([Some('2')]);
    let backend = Backend::new(&[Algorithm::Mosse, Algorithm::Mil, Algorithm::Csrt]);
    let mut session = Session::new(Config::default(), Frames::new(1), screen, backend).unwrap();

    // registry order is Csrt, Mil, Mosse regardless of how the backend lists them
    assert_eq!(session.registry().get(0), Some(Algorithm::Csrt));
    session.run().unwrap();
    assert_eq!(session.algorithm(), Algorithm::Mil);
}

#[test]
fn unavailable_tracker_falls_back_to_default() {
    let cfg = Config {
        tracker: "mosse".to_string(),
        ..Config::default()
    };
    let backend = Backend::new(&[Algorithm::Csrt, Algorithm::Kcf, Algorithm::Mil]);
    let session = Session::new(cfg, Frames::new(0), Screen::default(), backend).unwrap();

    assert_eq!(session.algorithm(), Algorithm::Kcf);
}

#[test]
fn unknown_tracker_name_falls_back_to_default() {
    let cfg = Config {
        tracker: "goturn".to_string(),
        ..Config::default()
    };
    let session = Session::new(cfg, Frames::new(0), Screen::default(), Backend::new(ALL)).unwrap();

    assert_eq!(session.algorithm(), Algorithm::Kcf);
}

#[test]
fn no_algorithms_is_fatal() {
    let res = Session::new(Config::default(), Frames::new(1), Screen::default(), Backend::new(&[]));

    assert!(matches!(res, Err(Error::NoAlgorithms)));
}

#[test]
fn one_failing_object_does_not_affect_others() {
    let screen = Screen::with_keys([Some('s'), Some('s'), None, None])
        .select(region())
        .select(BBox::ltwh(150.0, 10.0, 20.0, 20.0));
    let mut session = Session::new(config(true), Frames::new(4), screen, Backend::new(ALL)).unwrap();

    let summary = session.run().unwrap();
    assert_eq!(summary.exit, Exit::EndOfStream);

    let last = &session.surface().presented[3].1;
    assert_eq!(last.tracked, 2);
    assert_eq!(last.lost, 1);
    assert_eq!(last.markers.len(), 1);
    assert_eq!(last.markers[0].id, 0);
    assert!(last
        .labels()
        .iter()
        .any(|l| l.alert && l.text == "Tracking failure detected"));
}

#[test]
fn frame_rate_is_positive_and_finite() {
    let screen = Screen::with_keys([Some('s')]).select(region());
    let mut session =
        Session::new(Config::default(), Frames::new(20), screen, Backend::new(ALL)).unwrap();

    session.run().unwrap();

    for (_, overlay) in &session.surface().presented {
        assert!(overlay.fps.is_finite());
        assert!(overlay.fps > 0.0);
    }
}

struct Hands;

/// A right hand with index and middle finger raised.
fn peace_sign() -> Hand {
    let mut lms = [na::Point3::new(0.5, 0.5, 0.0); NUM_LANDMARKS];
    for tip in [LandmarkIdx::RingFingerTip, LandmarkIdx::PinkyTip] {
        lms[tip as usize].y = 0.7;
    }
    lms[LandmarkIdx::IndexFingerTip as usize].y = 0.1;
    lms[LandmarkIdx::MiddleFingerTip as usize].y = 0.1;

    Hand::new(lms, Some(Handedness::Right))
}

impl LandmarkDetector<Frame> for Hands {
    fn process(&mut self, frame: &Frame) -> Result<Vec<Hand>, Error> {
        match frame {
            1 => Ok(vec![peace_sign()]),
            2 => Err(Error::Landmarks("model exploded".into())),
            _ => Ok(vec![]),
        }
    }
}

#[test]
fn hands_are_counted_and_detector_errors_are_local() {
    let session = Session::new(Config::default(), Frames::new(3), Screen::default(), Backend::new(ALL))
        .unwrap();
    let mut session = session.with_hands(Box::new(Hands));

    let summary = session.run().unwrap();
    assert_eq!(summary.frames, 3);

    let presented = &session.surface().presented;
    assert_eq!(presented[0].1.total_fingers(), Some(2));
    assert_eq!(presented[0].1.labels().last().unwrap().text, "Fingers: 2");
    assert_eq!(presented[1].1.total_fingers(), Some(0));
    assert_eq!(presented[2].1.hands.as_ref().map(Vec::len), Some(0));
}

#[test]
fn hands_disabled_by_default() {
    let mut session =
        Session::new(Config::default(), Frames::new(1), Screen::default(), Backend::new(ALL))
            .unwrap();

    session.run().unwrap();

    let overlay = &session.surface().presented[0].1;
    assert_eq!(overlay.hands, None);
    assert_eq!(overlay.total_fingers(), None);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = Config {
        wait_ms: 0,
        ..Config::default()
    };

    assert!(matches!(
        Session::new(cfg, Frames::new(1), Screen::default(), Backend::new(ALL)),
        Err(Error::InvalidConfig(_))
    ));
}
