use std::cmp::Ordering;

use nalgebra::Point2;

use crate::error::{RectifyError, Result};

/// A point in source-image pixel space (origin top-left, y down)
pub type Point = Point2<f64>;

/// Four unordered corner points of a detected planar region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    points: [Point; 4],
}

impl Quadrilateral {
    /// Build from a slice that must hold exactly four finite points
    pub fn from_points(points: &[Point]) -> Result<Self> {
        let points: [Point; 4] = points.try_into().map_err(|_| {
            RectifyError::InvalidInput(format!(
                "expected exactly 4 corner points, got {}",
                points.len()
            ))
        })?;
        ensure_finite(&points)?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// Multiply every coordinate by `factor`.
    ///
    /// Used to map corners found on a downscaled copy back to the
    /// full-resolution image.
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(RectifyError::InvalidInput(format!(
                "scale factor must be positive and finite, got {factor}"
            )));
        }
        let points = self.points.map(|p| Point::new(p.x * factor, p.y * factor));
        ensure_finite(&points)?;
        Ok(Self { points })
    }
}

impl TryFrom<&[Point]> for Quadrilateral {
    type Error = RectifyError;

    fn try_from(points: &[Point]) -> Result<Self> {
        Self::from_points(points)
    }
}

fn ensure_finite(points: &[Point]) -> Result<()> {
    match points
        .iter()
        .position(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        Some(i) => Err(RectifyError::InvalidInput(format!(
            "corner {} has non-finite coordinates ({}, {})",
            i, points[i].x, points[i].y
        ))),
        None => Ok(()),
    }
}

/// Corners in canonical order: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedCorners {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl OrderedCorners {
    /// Wrap points the caller already knows to be in [tl, tr, br, bl] order
    pub fn from_array(corners: [Point; 4]) -> Result<Self> {
        ensure_finite(&corners)?;
        let [top_left, top_right, bottom_right, bottom_left] = corners;
        Ok(Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        })
    }

    pub fn to_array(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Output size from the longer of each pair of opposite edges.
    ///
    /// Each edge length is truncated before taking the maximum, so a
    /// perspective-skewed rectangle keeps its largest visible extent.
    pub fn dimensions(&self) -> RectDimensions {
        let width_bottom = distance(&self.bottom_right, &self.bottom_left);
        let width_top = distance(&self.top_right, &self.top_left);
        let height_right = distance(&self.top_right, &self.bottom_right);
        let height_left = distance(&self.top_left, &self.bottom_left);

        RectDimensions {
            width: (width_bottom.floor() as u32).max(width_top.floor() as u32),
            height: (height_right.floor() as u32).max(height_left.floor() as u32),
        }
    }

    /// Length of the longest of the four edges
    pub fn longest_edge(&self) -> f64 {
        let pts = self.to_array();
        (0..4)
            .map(|i| distance(&pts[i], &pts[(i + 1) % 4]))
            .fold(0.0, f64::max)
    }
}

/// Size of the rectified output in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectDimensions {
    pub width: u32,
    pub height: u32,
}

impl RectDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Destination rectangle corners in [tl, tr, br, bl] order
    pub fn destination_corners(&self, style: DestinationStyle) -> [Point; 4] {
        let w = self.width as f64;
        let h = self.height as f64;
        let br_x = match style {
            DestinationStyle::Legacy => w - 2.0,
            DestinationStyle::Corrected => w - 1.0,
        };
        [
            Point::new(0.0, 0.0),
            Point::new(w - 1.0, 0.0),
            Point::new(br_x, h - 1.0),
            Point::new(0.0, h - 1.0),
        ]
    }
}

/// Placement of the bottom-right destination corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestinationStyle {
    /// Bottom-right at `(width - 2, height - 1)`, bit-compatible with the
    /// classic four-point scanner transform.
    #[default]
    Legacy,
    /// Bottom-right at `(width - 1, height - 1)`
    Corrected,
}

fn distance(a: &Point, b: &Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Compare on `primary`, then x, then y, so equal keys only arise for
/// identical points
fn slot_order(primary: fn(&Point) -> f64) -> impl Fn(&&Point, &&Point) -> Ordering {
    move |a, b| {
        primary(a)
            .total_cmp(&primary(b))
            .then(a.x.total_cmp(&b.x))
            .then(a.y.total_cmp(&b.y))
    }
}

fn coord_sum(p: &Point) -> f64 {
    p.x + p.y
}

fn coord_diff(p: &Point) -> f64 {
    p.y - p.x
}

/// Order four points as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest `x + y`, bottom-right the largest. Top-right
/// has the smallest `y - x`, bottom-left the largest. Ties fall back to
/// x then y, so the result does not depend on input order.
///
/// Each slot is chosen independently, so the same point can land in two
/// slots. Collinear input does this, and so can a valid convex quad whose
/// corners sit near the 45° diagonals, e.g. the flat diamond
/// `(0,0) (10,-1) (20,0) (10,1)` orders to `[(0,0), (20,0), (20,0), (0,0)]`.
/// The rectifier rejects that geometry as degenerate.
pub fn order_points(points: &[Point]) -> Result<OrderedCorners> {
    let quad = Quadrilateral::from_points(points)?;
    Ok(order_quadrilateral(&quad))
}

/// Infallible ordering for an already validated quadrilateral
pub fn order_quadrilateral(quad: &Quadrilateral) -> OrderedCorners {
    let pts = quad.points();
    let by_sum = slot_order(coord_sum);
    let by_diff = slot_order(coord_diff);

    // Iterators over a non-empty array always yield a value.
    let pick = |best: Option<&Point>| *best.unwrap_or(&pts[0]);

    OrderedCorners {
        top_left: pick(pts.iter().min_by(&by_sum)),
        top_right: pick(pts.iter().min_by(&by_diff)),
        bottom_right: pick(pts.iter().max_by(&by_sum)),
        bottom_left: pick(pts.iter().max_by(&by_diff)),
    }
}
