use serde::{Deserialize, Serialize};

/// A landmark position normalized to the frame, `0.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub(crate) fn to_px(self, width: f64, height: f64) -> Px {
        Px(self.x * width, self.y * height)
    }
}

/// A position in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Px(pub f64, pub f64);

impl Px {
    pub fn distance(self, other: Px) -> f64 {
        (self.0 - other.0).hypot(self.1 - other.1)
    }
}

/// The face-mesh landmarks the rules look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub nose: Point,
    pub forehead: Point,
    pub left_cheek: Point,
    pub right_cheek: Point,
    #[serde(default)]
    pub left_iris: Option<Point>,
    #[serde(default)]
    pub right_iris: Option<Point>,
}

impl FaceLandmarks {
    /// Looking straight ahead from the middle of the frame.
    pub fn centered() -> Self {
        Self {
            nose: Point::new(0.5, 0.5),
            forehead: Point::new(0.5, 0.35),
            left_cheek: Point::new(0.38, 0.52),
            right_cheek: Point::new(0.62, 0.52),
            left_iris: Some(Point::new(0.45, 0.45)),
            right_iris: Some(Point::new(0.55, 0.45)),
        }
    }

    /// Cheek-to-iris distance on each side, when both irises were found.
    pub(crate) fn cheek_iris_px(&self, width: f64, height: f64) -> Option<(f64, f64)> {
        let left = self.left_iris?.to_px(width, height);
        let right = self.right_iris?.to_px(width, height);
        Some((
            self.left_cheek.to_px(width, height).distance(left),
            self.right_cheek.to_px(width, height).distance(right),
        ))
    }
}

/// Detector output for one video frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Capture time in seconds.
    pub ts: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
    /// Faces found by the detector, which may see faces the mesh could not
    /// fit. Falls back to `faces.len()`.
    #[serde(default)]
    pub faces_detected: Option<usize>,
    /// Share of the frame covered by large foreground changes.
    #[serde(default)]
    pub foreground_ratio: Option<f64>,
    /// Store this frame's landmarks as the reference pose.
    #[serde(default)]
    pub capture_reference: bool,
}

impl FrameSample {
    pub fn new(ts: f64, faces: Vec<FaceLandmarks>) -> Self {
        Self {
            ts,
            width: 1280,
            height: 720,
            faces,
            faces_detected: None,
            foreground_ratio: None,
            capture_reference: false,
        }
    }

    pub fn faces_detected(&self) -> usize {
        self.faces_detected.unwrap_or(self.faces.len())
    }
}

/// Where in the frame the nose points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Zone {
    /// Edges only; horizontal wins over vertical.
    pub fn coarse(p: Point, edge: f64) -> Self {
        if p.x < edge {
            Zone::Left
        } else if p.x > 1.0 - edge {
            Zone::Right
        } else if p.y < edge {
            Zone::Top
        } else if p.y > 1.0 - edge {
            Zone::Bottom
        } else {
            Zone::Center
        }
    }

    pub fn detailed(p: Point, edge: f64) -> Self {
        let left = p.x < edge;
        let right = p.x > 1.0 - edge;
        let top = p.y < edge;
        let bottom = p.y > 1.0 - edge;
        match (left, right, top, bottom) {
            (true, _, true, _) => Zone::TopLeft,
            (true, _, _, true) => Zone::BottomLeft,
            (_, true, true, _) => Zone::TopRight,
            (_, true, _, true) => Zone::BottomRight,
            (true, _, _, _) => Zone::Left,
            (_, true, _, _) => Zone::Right,
            (_, _, true, _) => Zone::Top,
            (_, _, _, true) => Zone::Bottom,
            _ => Zone::Center,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Center => "center",
            Zone::Left => "left",
            Zone::Right => "right",
            Zone::Top => "top",
            Zone::Bottom => "bottom",
            Zone::TopLeft => "top-left",
            Zone::TopRight => "top-right",
            Zone::BottomLeft => "bottom-left",
            Zone::BottomRight => "bottom-right",
        }
    }
}
