//! Persisted metadata records
//!
//! Bounding boxes live in the "paintings" store and are keyed by canonical title.
//! Landmark geometry lives in the "model" store and has no link back to a title.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

/// Pixel-space face rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x_lo: i64,
    pub x_hi: i64,
    pub y_lo: i64,
    pub y_hi: i64,
}

impl FaceBox {
    pub fn new(x_lo: i64, x_hi: i64, y_lo: i64, y_hi: i64) -> Self {
        Self { x_lo, x_hi, y_lo, y_hi }
    }
}

/// One `bounding_box` row. The face rectangle is present iff a face was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBoxRecord {
    pub title: String,
    pub face: Option<FaceBox>,
}

impl BoundingBoxRecord {
    pub fn no_face(title: impl Into<String>) -> Self {
        Self { title: title.into(), face: None }
    }

    pub fn with_face(title: impl Into<String>, face: FaceBox) -> Self {
        Self { title: title.into(), face: Some(face) }
    }

    pub fn has_face(&self) -> bool {
        self.face.is_some()
    }
}

/// A single landmark coordinate, encoded as a two-element JSON array
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Point(pub f64, pub f64);

impl Point {
    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

// JSON has no NaN or infinity; serde_json would write `null` and the row could
// never be decoded again.
impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.is_finite() {
            return Err(S::Error::custom(format!("non-finite coordinate ({}, {})", self.0, self.1)));
        }
        (self.0, self.1).serialize(serializer)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self(x, y)
    }
}

/// Ordered landmark points for one face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geometry(pub Vec<Point>);

impl Geometry {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode for a text column
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from a text column
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl FromIterator<Point> for Geometry {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Row of a landmark branch table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecord {
    pub id: i64,
    pub emotion_id: i64,
    pub points: Geometry,
    pub posed_points: Geometry,
}
