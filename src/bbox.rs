use serde::{Deserialize, Serialize};
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// Axis-aligned box in pixel coordinates of the frame it was produced on.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq>(
    [f32; 4],
    PhantomData<F>,
);

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        BBox([left, top, width, height], Default::default())
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over union, 0 for disjoint or empty boxes.
    pub fn iou(&self, other: &Self) -> f32 {
        let (a, b) = (self.as_ltrb(), other.as_ltrb());
        let inter = BBox::ltrb(
            a.left().max(b.left()),
            a.top().max(b.top()),
            a.right().min(b.right()),
            a.bottom().min(b.bottom()),
        )
        .as_ltwh()
        .area();

        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    /// A box with no width or no height, which is what a cancelled region
    /// selection produces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    /// Intersects the box with a `width` x `height` frame.
    pub fn clip(&self, width: f32, height: f32) -> Self {
        let r = self.as_ltrb();

        BBox::ltrb(
            r.left().clamp(0.0, width),
            r.top().clamp(0.0, height),
            r.right().clamp(0.0, width),
            r.bottom().clamp(0.0, height),
        )
        .as_ltwh()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom], Default::default())
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] + v.0[0], v.0[3] + v.0[1]],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            Default::default(),
        )
    }
}

#[cfg(feature = "cv")]
impl From<opencv::core::Rect> for BBox<Ltwh> {
    #[inline]
    fn from(r: opencv::core::Rect) -> Self {
        BBox::ltwh(r.x as f32, r.y as f32, r.width as f32, r.height as f32)
    }
}

#[cfg(feature = "cv")]
impl From<&BBox<Ltwh>> for opencv::core::Rect {
    #[inline]
    fn from(b: &BBox<Ltwh>) -> Self {
        opencv::core::Rect::new(
            b.left().round() as i32,
            b.top().round() as i32,
            b.width().round() as i32,
            b.height().round() as i32,
        )
    }
}

#[cfg(feature = "cv")]
impl From<opencv::core::Rect2d> for BBox<Ltwh> {
    #[inline]
    fn from(r: opencv::core::Rect2d) -> Self {
        BBox::ltwh(r.x as f32, r.y as f32, r.width as f32, r.height as f32)
    }
}

#[cfg(feature = "cv")]
impl From<&BBox<Ltwh>> for opencv::core::Rect2d {
    #[inline]
    fn from(b: &BBox<Ltwh>) -> Self {
        opencv::core::Rect2d::new(
            b.left() as f64,
            b.top() as f64,
            b.width() as f64,
            b.height() as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_boxes_are_empty() {
        assert!(BBox::ltwh(10.0, 10.0, 0.0, 20.0).is_empty());
        assert!(BBox::ltwh(10.0, 10.0, 20.0, 0.0).is_empty());
        assert!(BBox::ltwh(0.0, 0.0, -3.0, 5.0).is_empty());
        assert!(!BBox::ltwh(0.0, 0.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn ltrb_conversion() {
        let b = BBox::ltwh(10.0, 20.0, 30.0, 40.0);
        let r = b.as_ltrb();

        assert_eq!(r.as_slice(), &[10.0, 20.0, 40.0, 60.0]);
        assert_eq!(r.as_ltwh(), b);
    }

    #[test]
    fn clip_to_frame() {
        let b = BBox::ltwh(-10.0, 90.0, 50.0, 50.0).clip(100.0, 100.0);

        assert_eq!(b.as_slice(), &[0.0, 90.0, 40.0, 10.0]);
    }

    #[test]
    fn overlap() {
        let a = BBox::ltwh(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltwh(5.0, 0.0, 10.0, 10.0);

        assert_eq!(a.iou(&a), 1.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&BBox::ltwh(20.0, 20.0, 5.0, 5.0)), 0.0);
        assert_eq!(a.iou(&BBox::ltwh(0.0, 0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn box_outside_frame_clips_to_empty() {
        assert!(BBox::ltwh(120.0, 10.0, 30.0, 30.0).clip(100.0, 100.0).is_empty());
    }
}
