//! Transition geometry
//!
//! Pure functions computing the curved link and arrowhead drawn for a
//! transition between two circular state nodes, or the loop drawn when a
//! transition returns to its own source. Nothing here holds state.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};


/// Arrowhead base width
pub const ARROW_BASE: f64 = 10.0;
/// Arrowhead height, tip to base
pub const ARROW_HEIGHT: f64 = 10.0;

/// A point in canvas space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new(
            self.x + (other.x - self.x) / 2.0,
            self.y + (other.y - self.y) / 2.0,
        )
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Vector from `other` to `self`
    pub fn delta_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Link parameters shared by every transition on a canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkParams {
    /// Radius of the state circles; links attach at the boundary
    pub radius: f64,
    /// Bend applied to the midpoint of a link
    pub curvature: f64,
    /// How far a self-loop bulges out of its node
    pub loop_height: f64,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            radius: 30.0,
            curvature: 30.0,
            loop_height: 100.0,
        }
    }
}

/// Where a transition ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionEnd {
    /// Center of the destination node; the link is trimmed to its boundary
    Node(Point),
    /// Free-floating pointer position while a transition is being drawn
    Free(Point),
}

impl TransitionEnd {
    pub fn point(self) -> Point {
        match self {
            TransitionEnd::Node(p) | TransitionEnd::Free(p) => p,
        }
    }
}

/// Path of a transition link
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSpec {
    Quadratic {
        from: Point,
        control: Point,
        to: Point,
    },
    Cubic {
        from: Point,
        control1: Point,
        control2: Point,
        to: Point,
    },
}

impl PathSpec {
    pub fn start(&self) -> Point {
        match *self {
            PathSpec::Quadratic { from, .. } | PathSpec::Cubic { from, .. } => from,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            PathSpec::Quadratic { to, .. } | PathSpec::Cubic { to, .. } => to,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        matches!(self, PathSpec::Cubic { .. })
    }

    /// Point on the curve at parameter `t` in `[0, 1]`
    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        match *self {
            PathSpec::Quadratic { from, control, to } => Point::new(
                u * u * from.x + 2.0 * u * t * control.x + t * t * to.x,
                u * u * from.y + 2.0 * u * t * control.y + t * t * to.y,
            ),
            PathSpec::Cubic {
                from,
                control1,
                control2,
                to,
            } => {
                let a = u * u * u;
                let b = 3.0 * u * u * t;
                let c = 3.0 * u * t * t;
                let d = t * t * t;
                Point::new(
                    a * from.x + b * control1.x + c * control2.x + d * to.x,
                    a * from.y + b * control1.y + c * control2.y + d * to.y,
                )
            }
        }
    }

    /// Approximate the curve with `segments` straight segments
    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }

    /// Distance from `p` to the flattened curve
    pub fn distance_to(&self, p: Point) -> f64 {
        self.flatten(32)
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }

    /// The curve's midpoint, used to anchor labels
    pub fn label_anchor(&self) -> Point {
        self.point_at(0.5)
    }
}

impl fmt::Display for PathSpec {
    /// SVG path data
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Quadratic { from, control, to } => write!(
                f,
                "M {} {} Q {}, {}, {}, {}",
                from.x, from.y, control.x, control.y, to.x, to.y
            ),
            PathSpec::Cubic {
                from,
                control1,
                control2,
                to,
            } => write!(
                f,
                "M {} {} C {} {}, {} {}, {} {}",
                from.x, from.y, control1.x, control1.y, control2.x, control2.y, to.x, to.y
            ),
        }
    }
}

/// A closed polygon; the first point of an arrowhead is its tip
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    /// Point-in-polygon test (even-odd rule)
    pub fn contains(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl fmt::Display for Polygon {
    /// SVG path data
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut points = self.points.iter();
        if let Some(first) = points.next() {
            write!(f, "M {} {}", first.x, first.y)?;
            for p in points {
                write!(f, " L {} {}", p.x, p.y)?;
            }
            write!(f, " z")?;
        }
        Ok(())
    }
}

/// Link plus arrowhead for one transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionGeometry {
    pub link: PathSpec,
    pub arrow: Polygon,
}

/// Isosceles arrowhead with its apex at the tip
///
/// At rotation 0 the base lies on the +x side of the tip, so the arrow points
/// towards -x.
pub fn compute_arrowhead(tip_x: f64, tip_y: f64, rotation: f64) -> Polygon {
    let side = ((ARROW_BASE / 2.0).powi(2) + ARROW_HEIGHT.powi(2)).sqrt();
    let half_angle = (ARROW_BASE / 2.0 / ARROW_HEIGHT).atan();
    Polygon {
        points: vec![
            Point::new(tip_x, tip_y),
            Point::new(
                tip_x + (half_angle + rotation).cos() * side,
                tip_y + (half_angle + rotation).sin() * side,
            ),
            Point::new(
                tip_x + (-half_angle + rotation).cos() * side,
                tip_y + (-half_angle + rotation).sin() * side,
            ),
        ],
    }
}

/// Quadratic link whose control point is the midpoint shifted by
/// `(-curvature, +curvature)`
pub fn compute_curved_link(from_x: f64, from_y: f64, to_x: f64, to_y: f64, curvature: f64) -> PathSpec {
    let from = Point::new(from_x, from_y);
    let to = Point::new(to_x, to_y);
    PathSpec::Quadratic {
        from,
        control: from.midpoint(to).offset(-curvature, curvature),
        to,
    }
}

/// Loop anchored at the top of the node, bulging up and to the left
pub fn compute_self_loop(x: f64, y: f64, radius: f64, loop_height: f64) -> PathSpec {
    let anchor = Point::new(x, y - radius);
    PathSpec::Cubic {
        from: anchor,
        control1: Point::new(x, anchor.y - loop_height),
        control2: Point::new(x - loop_height, anchor.y),
        to: anchor,
    }
}

/// Link and arrowhead between a source node and a destination
///
/// The bend direction comes from `sign`, which mirrors the curvature for the
/// two directions of an edge pair so opposite transitions do not overlap.
/// The angle uses the single-argument arctangent: vertical edges resolve to
/// `±π/2` and leftward horizontal edges keep `sign = 1`.
pub fn compute_transition_geometry(src: Point, dest: TransitionEnd, params: LinkParams) -> TransitionGeometry {
    let target = dest.point();
    if src == target {
        return TransitionGeometry {
            link: compute_self_loop(src.x, src.y, params.radius, params.loop_height),
            arrow: compute_arrowhead(src.x, src.y - params.radius, -PI / 2.0),
        };
    }

    let theta = ((target.y - src.y) / (target.x - src.x)).atan();
    let sign = (if theta > 0.0 { -1.0 } else { 1.0 }) * (if target.y > src.y { -1.0 } else { 1.0 });

    let trim_x = sign * theta.cos() * params.radius;
    let trim_y = sign * theta.sin() * params.radius;
    let from = src.offset(trim_x, trim_y);
    let to = match dest {
        TransitionEnd::Node(p) => p.offset(-trim_x, -trim_y),
        TransitionEnd::Free(p) => p,
    };

    let bend = params.curvature * sign;
    let link = compute_curved_link(from.x, from.y, to.x, to.y, bend);
    let control = from.midpoint(to).offset(-bend, bend);
    let pointer_theta = ((to.y - control.y) / (to.x - control.x)).atan();
    let rotation = if sign < 0.0 { pointer_theta } else { PI + pointer_theta };

    TransitionGeometry {
        link,
        arrow: compute_arrowhead(to.x, to.y, rotation),
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b.delta_from(a);
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let ap = p.delta_from(a);
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a.offset(ab.x * t, ab.y * t))
}
