use crate::{Errors, EstimateClose, EPS};
use anyhow::Result;

/// Bounding box in the format (left, top, width, height)
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

impl BoundingBox {
    /// Constructor
    ///
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Constructor from corners (left, top, right, bottom)
    ///
    pub fn new_with_corners(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn area(&self) -> f32 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// Zero-area or inverted boxes can't participate in overlap computations
    ///
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn as_ltwh(&self) -> [f32; 4] {
        [self.left, self.top, self.width, self.height]
    }

    pub fn as_tlbr(&self) -> [f32; 4] {
        [self.left, self.top, self.right(), self.bottom()]
    }

    /// Converts to (center x, center y, aspect, height) representation used by the Kalman filter
    ///
    pub fn as_xyah(&self) -> Result<XyahBox> {
        XyahBox::try_from(self)
    }

    /// The area of intersection, zero when any of the boxes is degenerate
    ///
    pub fn intersection(l: &BoundingBox, r: &BoundingBox) -> f32 {
        if l.is_degenerate() || r.is_degenerate() {
            return 0.0;
        }

        let (x1, y1) = (l.left.max(r.left), l.top.max(r.top));
        let (x2, y2) = (l.right().min(r.right()), l.bottom().min(r.bottom()));

        let int_width = x2 - x1;
        let int_height = y2 - y1;

        if int_width > 0.0 && int_height > 0.0 {
            int_width * int_height
        } else {
            0.0
        }
    }

    /// Intersection over union, zero when any of the boxes is degenerate
    ///
    pub fn iou(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let intersection = BoundingBox::intersection(l, r);
        if intersection == 0.0 {
            return 0.0;
        }
        let union = l.area() + r.area() - intersection;
        intersection / union
    }
}

impl EstimateClose for BoundingBox {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.left - other.left).abs() < eps
            && (self.top - other.top).abs() < eps
            && (self.width - other.width).abs() < eps
            && (self.height - other.height).abs() < eps
    }
}

impl PartialEq<Self> for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

/// Bounding box in the format (center x, center y, aspect, height), where `aspect = width / height`
///
#[derive(Clone, Default, Debug, Copy)]
pub struct XyahBox {
    x: f32,
    y: f32,
    aspect: f32,
    height: f32,
}

impl XyahBox {
    pub fn new(x: f32, y: f32, aspect: f32, height: f32) -> Self {
        Self {
            x,
            y,
            aspect,
            height,
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn width(&self) -> f32 {
        self.aspect * self.height
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.x, self.y, self.aspect, self.height]
    }
}

impl EstimateClose for XyahBox {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self.x - other.x).abs() < eps
            && (self.y - other.y).abs() < eps
            && (self.aspect - other.aspect).abs() < eps
            && (self.height - other.height).abs() < eps
    }
}

impl PartialEq<Self> for XyahBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

impl TryFrom<&BoundingBox> for XyahBox {
    type Error = anyhow::Error;

    fn try_from(f: &BoundingBox) -> Result<Self> {
        if f.is_degenerate() {
            return Err(Errors::DegenerateBox(f.as_ltwh()).into());
        }
        Ok(XyahBox {
            x: f.left + f.width / 2.0,
            y: f.top + f.height / 2.0,
            aspect: f.width / f.height,
            height: f.height,
        })
    }
}

impl TryFrom<BoundingBox> for XyahBox {
    type Error = anyhow::Error;

    fn try_from(f: BoundingBox) -> Result<Self> {
        XyahBox::try_from(&f)
    }
}

impl From<&XyahBox> for BoundingBox {
    fn from(f: &XyahBox) -> Self {
        let width = f.width();
        BoundingBox {
            left: f.x - width / 2.0,
            top: f.y - f.height / 2.0,
            width,
            height: f.height,
        }
    }
}

impl From<XyahBox> for BoundingBox {
    fn from(f: XyahBox) -> Self {
        BoundingBox::from(&f)
    }
}
