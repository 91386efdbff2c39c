//! Pose synthesis of planar chains.
//!
//! A chain of points is sketched in two or more poses. The first segment
//! that rotates between the poses becomes the crank, the points before it
//! are the ground. Every following joint either keeps its angle to the
//! previous segment (a rigid extension) or gets a coupler joint and a
//! follower link, found by sweeping the coupler offset along the segment.
//!
//! ```
//! use linkage::syn::{synthesize, SynCfg};
//!
//! // A bent arm turning about its first point
//! let poses = [
//!     vec![[0., 0.], [10., 0.], [20., 5.]],
//!     vec![[0., 0.], [0., 10.], [-5., 20.]],
//! ];
//! let s = synthesize(&poses, &SynCfg::default()).unwrap();
//! assert_eq!(s.driver, 0);
//! assert!(s.linkages.is_empty());
//! ```
use crate::{
    line_line, point::wrap_angle, Branch, Error, Frame, GeoError, Mechanism, Point, Result,
    Side, EPS,
};

/// Configuration of the synthesis.
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[derive(Clone, Debug, PartialEq)]
pub struct SynCfg {
    /// Smallest coupler offset of the sweep
    #[cfg_attr(feature = "clap", arg(long, default_value_t = SynCfg::default().min))]
    pub min: f64,
    /// Largest coupler offset of the sweep
    #[cfg_attr(feature = "clap", arg(long, default_value_t = SynCfg::default().max))]
    pub max: f64,
    /// Increment of the sweep
    #[cfg_attr(feature = "clap", arg(long, default_value_t = SynCfg::default().step))]
    pub step: f64,
    /// Try this signed offset only
    #[cfg_attr(feature = "clap", arg(long, allow_hyphen_values = true))]
    pub offset: Option<f64>,
    /// Number of driving angle samples of the feasibility check
    #[cfg_attr(feature = "clap", arg(long, default_value_t = SynCfg::default().samples))]
    pub samples: usize,
    /// Angle tolerance of the rigid joint test, in radians
    #[cfg_attr(feature = "clap", arg(long, default_value_t = SynCfg::default().tol))]
    pub tol: f64,
    /// Direction of the ground line when the crank starts at the first point
    #[cfg_attr(
        feature = "clap",
        arg(long, default_value_t = 0., allow_hyphen_values = true)
    )]
    pub ground_angle: f64,
}

impl Default for SynCfg {
    fn default() -> Self {
        Self {
            min: 10.,
            max: 1000.,
            step: 5.,
            offset: None,
            samples: 90,
            tol: 1e-3,
            ground_angle: 0.,
        }
    }
}

impl SynCfg {
    /// Offsets in the order they are tried: ascending, then negated.
    pub fn offsets(&self) -> Vec<f64> {
        if let Some(l) = self.offset {
            return vec![l];
        }
        if !(self.step > 0.) || self.max < self.min {
            return Vec::new();
        }
        let n = ((self.max - self.min) / self.step + EPS).floor() as usize;
        let asc = (0..=n).map(|k| self.min + k as f64 * self.step);
        asc.clone().chain(asc.map(|l| -l)).collect()
    }
}

/// Linkage added to move a joint.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Linkage {
    /// Middle joint of the triple
    pub joint: usize,
    /// Added coupler joint
    pub coupler: usize,
    /// Added follower pivot
    pub pivot: usize,
    /// Signed offset of the coupler joint, positive away from the next point
    pub offset: f64,
    /// Length of the follower link
    pub follower: f64,
    /// Distance of the pivot from the hinge of its carrier
    pub pivot_offset: f64,
    /// Distance from the joint to the next point of the chain
    pub rest: f64,
    /// Branch side of the coupler joint
    pub side: Side,
}

/// Result of [`synthesize`].
#[derive(Clone, Debug, PartialEq)]
pub struct Synthesis {
    /// Mechanism at the first pose, chain point `k` is joint `k`
    pub mech: Mechanism,
    /// Added linkages
    pub linkages: Vec<Linkage>,
    /// Chain index of the crank pivot
    pub driver: usize,
    /// Crank angles of the first and the last pose
    pub angle_range: [f64; 2],
    /// Crank angle of each pose
    pub angles: Vec<f64>,
}

// Body carrying the next follower pivot
#[derive(Clone, Copy, Debug)]
enum Carrier {
    Ground { hinge: usize, dir: [f64; 2] },
    // Moving body with the frame from `a` toward the hinge `b`
    Body { a: usize, b: usize },
}

impl Carrier {
    fn frame(&self, pose: &[[f64; 2]]) -> Frame {
        match *self {
            Self::Ground { .. } => Frame::default(),
            Self::Body { a, b } => Frame::toward(pose[a], pose[b]),
        }
    }

    // Line of the pivot candidates in the carrier frame
    fn line(&self, pose: &[[f64; 2]]) -> [[f64; 2]; 2] {
        match *self {
            Self::Ground { hinge, dir } => [pose[hinge], pose[hinge].add(&dir)],
            Self::Body { a, b } => {
                let d = pose[a].dist(&pose[b]);
                [[d, 0.], [d + 1., 0.]]
            }
        }
    }
}

struct Ctx<'a> {
    poses: &'a [Vec<[f64; 2]>],
    angles: &'a [f64],
    scale: f64,
    cfg: &'a SynCfg,
}

impl Ctx<'_> {
    fn first(&self) -> &[[f64; 2]] {
        &self.poses[0]
    }

    fn last(&self) -> &[[f64; 2]] {
        &self.poses[self.poses.len() - 1]
    }
}

fn seg_angle(pose: &[[f64; 2]], i: usize) -> f64 {
    pose[i + 1].sub(&pose[i]).angle()
}

// Turning angle of the chain at joint `j`
fn joint_angle(pose: &[[f64; 2]], j: usize) -> f64 {
    wrap_angle(seg_angle(pose, j) - seg_angle(pose, j - 1))
}

/// Build a mechanism moving the chain through the poses.
///
/// Every pose lists the chain points in the same order. The result is
/// checked on the first and the last pose.
pub fn synthesize(poses: &[Vec<[f64; 2]>], cfg: &SynCfg) -> Result<Synthesis> {
    if poses.len() < 2 {
        return Err(GeoError::Degenerate("expect at least two poses").into());
    }
    let first: &[[f64; 2]] = &poses[0];
    let n = first.len();
    if n < 2 || poses.iter().any(|p| p.len() != n) {
        return Err(GeoError::Degenerate("poses must list the same points").into());
    }
    let scale = first
        .windows(2)
        .map(|w| w[0].dist(&w[1]))
        .fold(0., f64::max);
    if scale < EPS {
        return Err(GeoError::Degenerate("coincident chain points").into());
    }
    let driver = (0..n - 1)
        .find(|&i| {
            let a0 = seg_angle(first, i);
            poses
                .iter()
                .any(|p| wrap_angle(seg_angle(p, i) - a0).abs() > cfg.tol)
        })
        .ok_or(GeoError::Degenerate("the chain does not rotate"))?;
    let base_moves = (0..=driver)
        .any(|k| poses.iter().any(|p| p[k].dist(&first[k]) > cfg.tol * scale));
    if base_moves {
        return Err(GeoError::Degenerate("the chain base moves between poses").into());
    }
    let a0 = seg_angle(first, driver);
    let angles = poses
        .iter()
        .map(|p| a0 + wrap_angle(seg_angle(p, driver) - a0))
        .collect::<Vec<_>>();
    let angle_range = [angles[0], angles[angles.len() - 1]];
    tracing::info!(driver, ?angle_range, "driving segment found");

    let mut mech = Mechanism::new();
    first.iter().for_each(|p| {
        mech.add_point(*p);
    });
    mech.set_crank(driver, driver + 1, Some(angle_range))?;
    let mut carrier = if driver == 0 {
        let dir = [cfg.ground_angle.cos(), cfg.ground_angle.sin()];
        Carrier::Ground { hinge: 0, dir }
    } else {
        let dir = first[driver].sub(&first[driver - 1]);
        Carrier::Ground { hinge: driver, dir }
    };
    let ctx = Ctx { poses, angles: &angles, scale, cfg };
    let mut linkages = Vec::new();
    for j in driver + 1..n - 1 {
        let r0 = joint_angle(first, j);
        if poses
            .iter()
            .all(|p| wrap_angle(joint_angle(p, j) - r0).abs() <= cfg.tol)
        {
            tracing::debug!(joint = j, "rigid joint");
            mech.add_guided_link(j, j + 1, j - 1)?;
            continue;
        }
        let (m, linkage) = sweep(&mech, &ctx, carrier, j)?;
        mech = m;
        linkages.push(linkage);
        carrier = Carrier::Body { a: j - 1, b: j };
    }
    Ok(Synthesis { mech, linkages, driver, angle_range, angles })
}

fn sweep(mech: &Mechanism, ctx: &Ctx, carrier: Carrier, j: usize) -> Result<(Mechanism, Linkage)> {
    for l in ctx.cfg.offsets() {
        match candidate(mech, ctx, carrier, j, l) {
            Ok(found) => {
                tracing::info!(joint = j, offset = l, "linkage found");
                return Ok(found);
            }
            Err(e) => tracing::trace!(joint = j, offset = l, %e, "candidate rejected"),
        }
    }
    tracing::warn!(joint = j, "no feasible linkage");
    Err(Error::SynthesisUnsatisfiable { joint: j })
}

fn candidate(
    mech: &Mechanism,
    ctx: &Ctx,
    carrier: Carrier,
    j: usize,
    l: f64,
) -> Result<(Mechanism, Linkage)> {
    let coupler = |p: &[[f64; 2]]| -> Result<[f64; 2], GeoError> {
        let d = p[j].sub(&p[j + 1]);
        let norm = d.norm();
        if norm < EPS {
            return Err(GeoError::Degenerate("coincident chain points"));
        }
        Ok(p[j].add(&d.scale(l / norm)))
    };
    let (first, last) = (ctx.first(), ctx.last());
    let f0 = carrier.frame(first);
    let q0 = coupler(first)?;
    let a = f0.to_local(q0);
    let b = carrier.frame(last).to_local(coupler(last)?);
    if a.dist(&b) < EPS * ctx.scale {
        return Err(GeoError::Degenerate("coupler joint stays on its carrier").into());
    }
    let mid = a.mid(&b);
    let [h0, h1] = carrier.line(first);
    let pivot_local = line_line(mid, mid.add(&b.sub(&a).perp()), h0, h1)?;
    let pivot = f0.to_world(pivot_local);
    let side = Side::of(first[j], pivot, q0);

    let mut m = mech.clone();
    let pivot_id = m.add_point(pivot);
    if let Carrier::Body { a, b } = carrier {
        m.add_guided_link(b, pivot_id, a)?;
    }
    let q_id = m.add_point_with(q0, Branch::Side(side));
    m.add_link(j, q_id)?;
    m.add_link(pivot_id, q_id)?;
    m.add_guided_link(j, j + 1, q_id)?;
    feasible(&m, ctx, j + 1)?;
    let linkage = Linkage {
        joint: j,
        coupler: q_id,
        pivot: pivot_id,
        offset: l,
        follower: pivot_local.dist(&a),
        pivot_offset: pivot_local.dist(&h0),
        rest: first[j].dist(&first[j + 1]),
        side,
    };
    Ok((m, linkage))
}

// Solvable over the whole range, and the chain up to `upto` is reproduced
fn feasible(m: &Mechanism, ctx: &Ctx, upto: usize) -> Result<()> {
    let [lo, hi] = m.crank.as_ref().and_then(|c| c.bound()).ok_or(Error::NoDriver)?;
    let n = ctx.cfg.samples.max(1);
    let mut probe = m.clone();
    for s in 0..=n {
        probe.set_angle(lo + (hi - lo) * s as f64 / n as f64)?;
    }
    let last = ctx.angles.len() - 1;
    for (pose, theta) in [(ctx.first(), ctx.angles[0]), (ctx.last(), ctx.angles[last])] {
        probe.set_angle(theta)?;
        for (k, p) in pose.iter().enumerate().take(upto + 1) {
            if probe.pos(k)?.dist(p) > 1e-6 * ctx.scale {
                return Err(GeoError::Degenerate("the poses are not reproduced").into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_order() {
        let cfg = SynCfg { min: 10., max: 20., step: 5., ..SynCfg::default() };
        assert_eq!(cfg.offsets(), [10., 15., 20., -10., -15., -20.]);
        let cfg = SynCfg { offset: Some(-30.), ..cfg };
        assert_eq!(cfg.offsets(), [-30.]);
        let cfg = SynCfg { offset: None, step: 0., ..cfg };
        assert!(cfg.offsets().is_empty());
    }

    #[test]
    fn rigid_chain() {
        // The whole chain turns about the first point
        let chain = [[0., 0.], [10., 0.], [20., 5.]];
        let turned = chain.map(|p| Frame::new([0., 0.], 0.5).to_world(p)).to_vec();
        let s = synthesize(&[chain.to_vec(), turned], &SynCfg::default()).unwrap();
        assert_eq!(s.driver, 0);
        assert!(s.linkages.is_empty());
        assert!(s.mech.links[0].guide.is_some());
    }

    #[test]
    fn degenerate_input() {
        let chain = vec![[0., 0.], [10., 0.]];
        let e = synthesize(&[chain.clone(), chain.clone()], &SynCfg::default());
        assert!(matches!(e, Err(Error::Geo(GeoError::Degenerate(_)))));
        let e = synthesize(&[chain], &SynCfg::default());
        assert!(matches!(e, Err(Error::Geo(GeoError::Degenerate(_)))));
    }
}
