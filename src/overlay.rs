//! What gets drawn on top of a displayed frame.

use crate::algorithm::Algorithm;
use crate::bbox::{BBox, Ltwh};
use crate::hand::Hand;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: u32,
    pub bbox: BBox<Ltwh>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandMarker {
    pub hand: Hand,
    pub fingers: usize,
}

/// A line of text in the top left corner. `alert` lines are drawn in the
/// failure colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub alert: bool,
}

impl Label {
    fn plain(text: String) -> Self {
        Self { text, alert: false }
    }

    fn alert(text: String) -> Self {
        Self { text, alert: true }
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Boxes of the objects whose last update succeeded.
    pub markers: Vec<Marker>,
    pub algorithm: Algorithm,
    pub fps: f64,
    pub tracked: usize,
    pub lost: usize,
    /// `None` when hand tracking is disabled.
    pub hands: Option<Vec<HandMarker>>,
}

impl Overlay {
    pub fn total_fingers(&self) -> Option<usize> {
        self.hands
            .as_ref()
            .map(|hands| hands.iter().map(|h| h.fingers).sum())
    }

    /// Text lines drawn in the top left corner, top to bottom.
    pub fn labels(&self) -> Vec<Label> {
        let mut labels = vec![
            Label::plain(format!("Tracker: {}", self.algorithm)),
            Label::plain(format!("FPS: {:.0}", self.fps)),
        ];

        if self.tracked == 0 {
            labels.push(Label::plain("Press 's' to select a region".to_string()));
        } else {
            labels.push(Label::plain(format!("Objects: {}", self.tracked)));
        }

        if self.lost > 0 {
            labels.push(Label::alert("Tracking failure detected".to_string()));
        }

        if let Some(total) = self.total_fingers() {
            labels.push(Label::plain(format!("Fingers: {}", total)));
        }

        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> Overlay {
        Overlay {
            markers: vec![],
            algorithm: Algorithm::Csrt,
            fps: 29.6,
            tracked: 0,
            lost: 0,
            hands: None,
        }
    }

    #[test]
    fn idle_labels() {
        assert_eq!(
            overlay().labels(),
            vec!["Tracker: CSRT", "FPS: 30", "Press 's' to select a region"]
        );
    }

    #[test]
    fn failure_and_fingers() {
        let ov = Overlay {
            tracked: 2,
            lost: 1,
            hands: Some(vec![]),
            ..overlay()
        };

        assert_eq!(
            ov.labels(),
            vec![
                "Tracker: CSRT",
                "FPS: 30",
                "Objects: 2",
                "Tracking failure detected",
                "Fingers: 0"
            ]
        );
    }

    #[test]
    fn only_failure_label_is_an_alert() {
        let ov = Overlay {
            tracked: 1,
            lost: 1,
            ..overlay()
        };
        let alerts: Vec<_> = ov
            .labels()
            .into_iter()
            .filter(|l| l.alert)
            .map(|l| l.text)
            .collect();

        assert_eq!(alerts, vec!["Tracking failure detected"]);
        assert!(overlay().labels().iter().all(|l| !l.alert));
    }
}
