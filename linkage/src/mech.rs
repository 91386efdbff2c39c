//! Linkage mechanism model.
//!
//! A [`Mechanism`] is an arena of joints, the links, gear assemblies, rigid
//! bodies and the crank refer to the joints by index.
pub use self::{
    body::Body,
    four_bar::FourBar,
    gear::{Assembly, AssemblyPose, Gear},
};
use crate::{point::wrap_angle, solver, Branch, Error, Point, Result, EPS};

mod body;
mod four_bar;
mod gear;

/// Guide rule of a joint with a single incoming link.
///
/// The joint sits at the link length from the link start, along the
/// direction `from -> start` turned by `angle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    /// Reference joint of the direction
    pub from: usize,
    /// Angle offset of the direction
    pub angle: f64,
}

impl Guide {
    /// The guide that reproduces the current positions.
    pub fn fit(from: usize, start: [f64; 2], end: [f64; 2], from_pos: [f64; 2]) -> Self {
        let angle = wrap_angle(end.sub(&start).angle() - start.sub(&from_pos).angle());
        Self { from, angle }
    }
}

/// Joint of the mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Current position
    pub pos: [f64; 2],
    /// Branch selection of the circle-circle intersection
    pub branch: Branch,
    /// Displacement of the last successful step
    pub flow: [f64; 2],
}

impl Joint {
    /// Create a joint at `pos` with the nearest branch.
    pub fn new(pos: [f64; 2]) -> Self {
        Self::with_branch(pos, Branch::Nearest)
    }

    /// Create a joint with a branch selection.
    pub fn with_branch(pos: [f64; 2], branch: Branch) -> Self {
        Self { pos, branch, flow: [0.; 2] }
    }

    /// Predicted position of the next step.
    pub fn expected(&self) -> [f64; 2] {
        self.pos.add(&self.flow)
    }
}

/// Rigid distance constraint from `start` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Start joint
    pub start: usize,
    /// End joint, the constrained one
    pub end: usize,
    /// Fixed length
    pub len: f64,
    /// Order of the link among the incoming links of `end`
    pub slot: u8,
    /// Guide rule, used when this is the only incoming link
    pub guide: Option<Guide>,
}

/// Rotating input link.
#[derive(Debug, Clone, PartialEq)]
pub struct Crank {
    /// Pivot joint
    pub pivot: usize,
    /// Driven joint
    pub tip: usize,
    /// Length of the crank
    pub len: f64,
    /// Current angle
    pub theta: f64,
    /// Allowed interval of the angle, unbounded if none
    pub range: Option<[f64; 2]>,
}

impl Crank {
    /// Sorted bounds of the range.
    pub fn bound(&self) -> Option<[f64; 2]> {
        self.range.map(|[a, b]| [a.min(b), a.max(b)])
    }

    /// Check the angle against the range.
    pub fn check(&self, theta: f64) -> Result<()> {
        match self.bound() {
            Some([min, max]) if theta < min - EPS || theta > max + EPS => {
                Err(Error::OutOfRange { theta, min, max })
            }
            _ => Ok(()),
        }
    }

    /// Tip position from the pivot position.
    pub fn tip_pos(&self, pivot: [f64; 2]) -> [f64; 2] {
        pivot.pla(self.len, self.theta)
    }
}

// Take the turn of the angle closest to the middle of the range
fn unwrap_into(theta: f64, range: Option<[f64; 2]>) -> f64 {
    match range {
        Some([a, b]) => {
            let mid = 0.5 * (a + b);
            mid + wrap_angle(theta - mid)
        }
        None => theta,
    }
}

struct Snapshot {
    pos: Vec<[f64; 2]>,
    phases: Vec<(f64, Vec<f64>)>,
    theta: Option<f64>,
}

/// Planar linkage mechanism.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mechanism {
    /// Joints
    pub joints: Vec<Joint>,
    /// Links
    pub links: Vec<Link>,
    /// Gear assemblies
    pub assemblies: Vec<Assembly>,
    /// Rigid bodies
    pub bodies: Vec<Body>,
    /// Rotating input link
    pub crank: Option<Crank>,
}

impl Mechanism {
    /// Create an empty mechanism.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a joint with the nearest branch, return its index.
    pub fn add_point(&mut self, pos: [f64; 2]) -> usize {
        self.add_joint(Joint::new(pos))
    }

    /// Add a joint with a branch selection, return its index.
    pub fn add_point_with(&mut self, pos: [f64; 2], branch: Branch) -> usize {
        self.add_joint(Joint::with_branch(pos, branch))
    }

    /// Add a joint, return its index.
    pub fn add_joint(&mut self, joint: Joint) -> usize {
        self.joints.push(joint);
        self.joints.len() - 1
    }

    /// Position of a joint.
    pub fn pos(&self, id: usize) -> Result<[f64; 2]> {
        self.joints
            .get(id)
            .map(|j| j.pos)
            .ok_or(Error::UnknownPoint(id))
    }

    /// Positions of all joints.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.joints.iter().map(|j| j.pos).collect()
    }

    /// Number of the links ending at `id`.
    pub fn in_degree(&self, id: usize) -> usize {
        self.links.iter().filter(|l| l.end == id).count()
    }

    /// Add a link between two joints, the length is their current distance.
    pub fn add_link(&mut self, start: usize, end: usize) -> Result<usize> {
        let len = self.pos(start)?.dist(&self.pos(end)?);
        let slot = self.in_degree(end) as u8;
        self.push_link(Link { start, end, len, slot, guide: None })
    }

    /// Add a guided link, the guide angle reproduces the current positions.
    pub fn add_guided_link(&mut self, start: usize, end: usize, from: usize) -> Result<usize> {
        let (p_start, p_end) = (self.pos(start)?, self.pos(end)?);
        let guide = Guide::fit(from, p_start, p_end, self.pos(from)?);
        let slot = self.in_degree(end) as u8;
        let len = p_start.dist(&p_end);
        self.push_link(Link { start, end, len, slot, guide: Some(guide) })
    }

    /// Add a link as is.
    pub fn push_link(&mut self, link: Link) -> Result<usize> {
        self.pos(link.start)?;
        self.pos(link.end)?;
        if let Some(guide) = &link.guide {
            self.pos(guide.from)?;
        }
        self.links.push(link);
        Ok(self.links.len() - 1)
    }

    /// Add a gear assembly.
    pub fn add_assembly(&mut self, asm: Assembly) -> Result<usize> {
        asm.check()?;
        self.pos(asm.end_effector)?;
        self.assemblies.push(asm);
        Ok(self.assemblies.len() - 1)
    }

    /// Add a rigid body.
    pub fn add_body(&mut self, body: Body) -> Result<usize> {
        body.pivots.iter().try_for_each(|&id| self.pos(id).map(|_| ()))?;
        self.bodies.push(body);
        Ok(self.bodies.len() - 1)
    }

    /// Set the crank from the current positions.
    pub fn set_crank(&mut self, pivot: usize, tip: usize, range: Option<[f64; 2]>) -> Result<()> {
        let (p, t) = (self.pos(pivot)?, self.pos(tip)?);
        let theta = unwrap_into(t.sub(&p).angle(), range);
        self.crank = Some(Crank { pivot, tip, len: p.dist(&t), theta, range });
        Ok(())
    }

    /// Validate the topology.
    pub fn check(&self) -> Result<Vec<solver::Rule>> {
        solver::rules(self)
    }

    /// Place every joint from the driven ones.
    ///
    /// The positions are only written when all joints are solved.
    pub fn forward_kinematics(&mut self) -> Result<()> {
        let pos = solver::solve(self)?;
        self.joints
            .iter_mut()
            .zip(pos)
            .for_each(|(j, p)| j.pos = p);
        Ok(())
    }

    /// Advance every driver by `step`, then solve.
    ///
    /// On failure, the mechanism is restored to its previous configuration.
    pub fn step(&mut self, step: f64) -> Result<()> {
        let last = self.transact(|m| m.advance(step))?;
        for (j, p) in self.joints.iter_mut().zip(last) {
            j.flow = j.pos.sub(&p);
        }
        Ok(())
    }

    /// Step along the direction of `step`.
    pub fn step_forward(&mut self, step: f64) -> Result<()> {
        self.step(step)
    }

    /// Step against the direction of `step`.
    pub fn step_backward(&mut self, step: f64) -> Result<()> {
        self.step(-step)
    }

    /// Turn the crank to an angle.
    pub fn set_angle(&mut self, theta: f64) -> Result<()> {
        self.transact(|m| {
            let crank = m.crank.as_mut().ok_or(Error::NoDriver)?;
            crank.check(theta)?;
            crank.theta = theta;
            Ok(())
        })
        .map(|_| ())
    }

    /// Current angle of the crank.
    pub fn angle(&self) -> Option<f64> {
        self.crank.as_ref().map(|c| c.theta)
    }

    /// Set the driving phase of an assembly.
    pub fn set_driving_phase(&mut self, asm: usize, phase: f64) -> Result<()> {
        self.transact(|m| {
            let a = m
                .assemblies
                .get_mut(asm)
                .ok_or(Error::UnknownElement { kind: "assembly", id: asm })?;
            let end = a.set_phase(phase).map_err(|source| Error::ForwardKinematics {
                point: a.end_effector,
                source,
            })?;
            let id = a.end_effector;
            m.joints.get_mut(id).ok_or(Error::UnknownPoint(id))?.pos = end;
            Ok(())
        })
        .map(|_| ())
    }

    /// Move a joint and take its new distances as the link lengths.
    ///
    /// On failure, the mechanism is restored.
    pub fn move_point(&mut self, id: usize, pos: [f64; 2]) -> Result<()> {
        self.pos(id)?;
        let backup = self.clone();
        match self.relocate(id, pos).and_then(|()| self.forward_kinematics()) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(point = id, %e, "move rejected");
                *self = backup;
                Err(e)
            }
        }
    }

    /// World polygon of a body.
    pub fn body_polygon(&self, body: usize) -> Result<Vec<[f64; 2]>> {
        self.bodies
            .get(body)
            .ok_or(Error::UnknownElement { kind: "body", id: body })?
            .world_polygon(self)
    }

    fn relocate(&mut self, id: usize, pos: [f64; 2]) -> Result<()> {
        self.joints.get_mut(id).ok_or(Error::UnknownPoint(id))?.pos = pos;
        let p = self.positions();
        for link in &mut self.links {
            if link.start == id || link.end == id {
                link.len = p[link.start].dist(&p[link.end]);
            }
            if let Some(guide) = &mut link.guide {
                if [link.start, link.end, guide.from].contains(&id) {
                    *guide = Guide::fit(guide.from, p[link.start], p[link.end], p[guide.from]);
                }
            }
        }
        if let Some(crank) = &mut self.crank {
            if crank.pivot == id || crank.tip == id {
                let v = p[crank.tip].sub(&p[crank.pivot]);
                crank.len = v.norm();
                crank.theta = unwrap_into(v.angle(), crank.range);
                crank.check(crank.theta)?;
            }
        }
        Ok(())
    }

    fn advance(&mut self, step: f64) -> Result<()> {
        for asm in &mut self.assemblies {
            let end = asm.forward(step).map_err(|source| Error::ForwardKinematics {
                point: asm.end_effector,
                source,
            })?;
            let id = asm.end_effector;
            self.joints.get_mut(id).ok_or(Error::UnknownPoint(id))?.pos = end;
        }
        if let Some(crank) = &mut self.crank {
            let theta = crank.theta + step;
            crank.check(theta)?;
            crank.theta = theta;
        }
        Ok(())
    }

    // Apply a change and solve, return the positions before the change
    fn transact<F>(&mut self, f: F) -> Result<Vec<[f64; 2]>>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let snapshot = self.snapshot();
        match f(self).and_then(|()| self.forward_kinematics()) {
            Ok(()) => Ok(snapshot.pos),
            Err(e) => {
                tracing::debug!(%e, "configuration rejected");
                self.restore(snapshot);
                Err(e)
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.positions(),
            phases: self.assemblies.iter().map(Assembly::phases).collect(),
            theta: self.angle(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let Snapshot { pos, phases, theta } = snapshot;
        self.joints
            .iter_mut()
            .zip(pos)
            .for_each(|(j, p)| j.pos = p);
        self.assemblies
            .iter_mut()
            .zip(phases)
            .for_each(|(a, p)| a.set_phases(p));
        if let (Some(crank), Some(theta)) = (&mut self.crank, theta) {
            crank.theta = theta;
        }
    }
}
