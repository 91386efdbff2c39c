//! Geometric primitives: circle/line intersections and local frames.
use crate::point::Point;
use nalgebra as na;

/// Tolerance of the geometric predicates.
pub const EPS: f64 = 1e-9;

/// Failure of a geometric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    /// The circles are separated, nested or concentric.
    #[error("the circles have no intersection")]
    NoIntersection,
    /// The input cannot define the requested figure.
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),
}

/// Side of a point relative to a directed line.
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Counter-clockwise side
    #[default]
    Left,
    /// Clockwise side
    Right,
}

impl Side {
    /// The side of `p` relative to the directed line `a -> b`.
    ///
    /// Collinear points are counted as [`Side::Left`].
    pub fn of(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> Self {
        if b.sub(&a).cross(&p.sub(&a)) >= 0. {
            Self::Left
        } else {
            Self::Right
        }
    }

    /// The opposite side.
    pub fn flip(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Candidate selection of a circle-circle intersection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Always take the first ("+") candidate.
    Plus,
    /// Take the candidate closest to the expected position.
    #[default]
    Nearest,
    /// Take the candidate on a side of the line between the centres.
    Side(Side),
}

impl Branch {
    /// Choose one of the candidates `[plus, minus]` from [`circle_circle`].
    ///
    /// `c1 -> c2` is the centre line used by [`Branch::Side`], `expected` is
    /// used by [`Branch::Nearest`]. Ties go to the "+" candidate.
    pub fn pick(
        self,
        [plus, minus]: [[f64; 2]; 2],
        c1: [f64; 2],
        c2: [f64; 2],
        expected: [f64; 2],
    ) -> [f64; 2] {
        match self {
            Self::Plus => plus,
            Self::Nearest => {
                if minus.dist(&expected) < plus.dist(&expected) {
                    minus
                } else {
                    plus
                }
            }
            Self::Side(side) => {
                let d = c2.sub(&c1);
                let cross_plus = d.cross(&plus.sub(&c1));
                let cross_minus = d.cross(&minus.sub(&c1));
                let left_is_plus = cross_plus >= cross_minus;
                match (side, left_is_plus) {
                    (Side::Left, true) | (Side::Right, false) => plus,
                    _ => minus,
                }
            }
        }
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Plus => write!(f, "plus"),
            Self::Nearest => write!(f, "near"),
            Self::Side(side) => side.fmt(f),
        }
    }
}

impl std::str::FromStr for Branch {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plus" => Ok(Self::Plus),
            "near" | "nearest" => Ok(Self::Nearest),
            "left" => Ok(Self::Side(Side::Left)),
            "right" => Ok(Self::Side(Side::Right)),
            _ => Err(GeoError::Degenerate("unknown branch name")),
        }
    }
}

/// Behavior when two circles do not meet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Report [`GeoError::NoIntersection`].
    #[default]
    Strict,
    /// Answer the midpoint of the centres for both candidates.
    ClampToMidpoint,
}

/// Intersections of the circle `(c1, r1)` and the circle `(c2, r2)`.
///
/// Returns `[plus, minus]`, the "+" candidate lies on the left side of the
/// directed line `c1 -> c2`. Tangent circles give two equal candidates.
pub fn circle_circle(
    c1: [f64; 2],
    r1: f64,
    c2: [f64; 2],
    r2: f64,
    policy: Policy,
) -> Result<[[f64; 2]; 2], GeoError> {
    let v = c2.sub(&c1);
    let d = v.norm();
    let separated = d - (r1 + r2) > EPS;
    let nested = (r1 - r2).abs() - d > EPS;
    if d < EPS || separated || nested {
        return match policy {
            Policy::Strict => Err(GeoError::NoIntersection),
            Policy::ClampToMidpoint => {
                let mid = c1.mid(&c2);
                Ok([mid, mid])
            }
        };
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2. * d);
    let h = (r1 * r1 - a * a).max(0.).sqrt();
    let u = v.scale(1. / d);
    let base = c1.add(&u.scale(a));
    let n = u.perp().scale(h);
    Ok([base.add(&n), base.sub(&n)])
}

/// Circle-circle intersection with a branch selection.
pub fn pllp(
    c1: [f64; 2],
    r1: f64,
    c2: [f64; 2],
    r2: f64,
    branch: Branch,
    expected: [f64; 2],
) -> Result<[f64; 2], GeoError> {
    let candidates = circle_circle(c1, r1, c2, r2, Policy::Strict)?;
    Ok(branch.pick(candidates, c1, c2, expected))
}

/// Intersection of the line through `p1, p2` and the line through `p3, p4`.
pub fn line_line(
    p1: [f64; 2],
    p2: [f64; 2],
    p3: [f64; 2],
    p4: [f64; 2],
) -> Result<[f64; 2], GeoError> {
    let d1 = p2.sub(&p1);
    let d2 = p4.sub(&p3);
    let (n1, n2) = (d1.norm(), d2.norm());
    if n1 < EPS || n2 < EPS {
        return Err(GeoError::Degenerate("zero-length line"));
    }
    let denom = d1.cross(&d2);
    if denom.abs() < EPS * n1 * n2 {
        return Err(GeoError::Degenerate("parallel lines"));
    }
    let t = p3.sub(&p1).cross(&d2) / denom;
    Ok(p1.add(&d1.scale(t)))
}

/// A rigid 2-D frame: origin plus the direction of its x axis.
///
/// Coordinates of a rigid body are stored in its frame, so they stay valid
/// while the body moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame(na::Isometry2<f64>);

impl Default for Frame {
    fn default() -> Self {
        Self(na::Isometry2::identity())
    }
}

impl Frame {
    /// Create a frame at `origin`, rotated by `angle`.
    pub fn new(origin: [f64; 2], angle: f64) -> Self {
        Self(na::Isometry2::new(na::Vector2::from(origin), angle))
    }

    /// The x axis points from `origin` toward `target`.
    pub fn toward(origin: [f64; 2], target: [f64; 2]) -> Self {
        Self::new(origin, target.sub(&origin).angle())
    }

    /// The x axis points from `target` toward `origin`.
    pub fn away(origin: [f64; 2], target: [f64; 2]) -> Self {
        Self::new(origin, origin.sub(&target).angle())
    }

    /// Origin of the frame in world coordinates.
    pub fn origin(&self) -> [f64; 2] {
        self.0.translation.vector.into()
    }

    /// Rotation angle of the frame.
    pub fn angle(&self) -> f64 {
        self.0.rotation.angle()
    }

    /// Express a world point in this frame.
    pub fn to_local(&self, p: [f64; 2]) -> [f64; 2] {
        self.0.inverse_transform_point(&na::Point2::from(p)).into()
    }

    /// Express a local point in world coordinates.
    pub fn to_world(&self, p: [f64; 2]) -> [f64; 2] {
        self.0.transform_point(&na::Point2::from(p)).into()
    }
}
