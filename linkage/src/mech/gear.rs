//! Gear pairs driving a two-link dyad.
use crate::{circle_circle, Branch, Error, GeoError, Point, Policy, Result};

/// A gear carrying a link end on its rim.
#[derive(Debug, Clone, PartialEq)]
pub struct Gear {
    /// Center of the gear
    pub center: [f64; 2],
    /// Radius of the link end on the gear
    pub radius: f64,
    /// Current phase
    pub phase: f64,
    /// Phase increment per driving step, negative for a reversed gear
    pub speed: f64,
}

impl Gear {
    /// Create a gear at phase zero with unit speed.
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Self { center, radius, phase: 0., speed: 1. }
    }

    /// Set the initial phase.
    pub fn with_phase(self, phase: f64) -> Self {
        Self { phase, ..self }
    }

    /// Set the speed.
    pub fn with_speed(self, speed: f64) -> Self {
        Self { speed, ..self }
    }

    /// Position of the link end.
    pub fn link_end(&self) -> [f64; 2] {
        self.center.pla(self.radius, self.phase)
    }
}

/// Solved configuration of an [`Assembly`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyPose {
    /// Link ends on the two gears
    pub ends: [[f64; 2]; 2],
    /// Joint of the dyad
    pub joint: [f64; 2],
    /// End effector
    pub end: [f64; 2],
}

/// Two gears driving a dyad, the end effector extends the first link.
///
/// + Link `lens[0]` from the first ordered gear to the joint
/// + Link `lens[1]` from the second ordered gear to the joint
/// + Extension `lens[2]` beyond the joint, zero if missing
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Gears
    pub gears: Vec<Gear>,
    /// Gears feeding the first and the second link
    pub order: [usize; 2],
    /// Link lengths
    pub lens: Vec<f64>,
    /// Joint moved by the assembly
    pub end_effector: usize,
    /// Driving phase
    pub phase: f64,
    /// Behavior when the dyad cannot close
    pub policy: Policy,
}

impl Assembly {
    /// Create a new assembly.
    pub fn new(gears: Vec<Gear>, order: [usize; 2], lens: Vec<f64>, end_effector: usize) -> Self {
        Self { gears, order, lens, end_effector, phase: 0., policy: Policy::Strict }
    }

    /// Set the policy.
    pub fn with_policy(self, policy: Policy) -> Self {
        Self { policy, ..self }
    }

    /// Check the gear order and the link lengths.
    pub fn check(&self) -> Result<()> {
        let [a, b] = self.order;
        if a == b || a >= self.gears.len() || b >= self.gears.len() {
            return Err(Error::InvalidAssembly("gear order out of bounds"));
        }
        if !(2..=3).contains(&self.lens.len()) {
            return Err(Error::InvalidAssembly("expect two or three link lengths"));
        }
        if self.lens.iter().any(|l| !l.is_finite() || *l < 0.) {
            return Err(Error::InvalidAssembly("invalid link length"));
        }
        Ok(())
    }

    /// Solve the dyad at the current phases.
    pub fn pose(&self) -> Result<AssemblyPose, GeoError> {
        let [a, b] = self.order;
        let (g1, g2) = match (self.gears.get(a), self.gears.get(b)) {
            (Some(g1), Some(g2)) => (g1, g2),
            _ => return Err(GeoError::Degenerate("gear order out of bounds")),
        };
        let (p1, p2) = (g1.link_end(), g2.link_end());
        let (l1, l2) = match self.lens[..] {
            [l1, l2, ..] => (l1, l2),
            _ => return Err(GeoError::Degenerate("missing link lengths")),
        };
        let ext = self.lens.get(2).copied().unwrap_or(0.);
        let candidates = circle_circle(p1, l1, p2, l2, self.policy)?;
        let joint = Branch::Plus.pick(candidates, p1, p2, p1);
        let end = joint.extend(ext, 0., &p1);
        Ok(AssemblyPose { ends: [p1, p2], joint, end })
    }

    /// Position of the end effector.
    pub fn end_effector_pos(&self) -> Result<[f64; 2], GeoError> {
        self.pose().map(|p| p.end)
    }

    /// Advance the gears by `step`, return the new end effector position.
    ///
    /// The phases are not reverted on failure.
    pub fn forward(&mut self, step: f64) -> Result<[f64; 2], GeoError> {
        self.phase += step;
        for g in &mut self.gears {
            g.phase += step * g.speed;
        }
        self.end_effector_pos()
    }

    /// Move to the driving phase `phase`.
    pub fn set_phase(&mut self, phase: f64) -> Result<[f64; 2], GeoError> {
        self.forward(phase - self.phase)
    }

    pub(crate) fn phases(&self) -> (f64, Vec<f64>) {
        (self.phase, self.gears.iter().map(|g| g.phase).collect())
    }

    pub(crate) fn set_phases(&mut self, (phase, gears): (f64, Vec<f64>)) {
        self.phase = phase;
        self.gears
            .iter_mut()
            .zip(gears)
            .for_each(|(g, p)| g.phase = p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pair() -> Assembly {
        let gears = vec![
            Gear::new([0., 0.], 10.),
            Gear::new([100., 0.], 10.).with_speed(-1.),
        ];
        Assembly::new(gears, [0, 1], vec![60., 60., 30.], 0)
    }

    #[test]
    fn extension() {
        let asm = pair();
        let pose = asm.pose().unwrap();
        let l1 = pose.joint.dist(&pose.ends[0]);
        assert_abs_diff_eq!(l1, 60., epsilon = 1e-9);
        assert_abs_diff_eq!(pose.end.dist(&pose.ends[0]), 90., epsilon = 1e-9);
        // "+" branch of the first link end toward the second
        assert!(pose.joint[1] > 0.);
    }

    #[test]
    fn forward_and_back() {
        let mut asm = pair();
        let start = asm.end_effector_pos().unwrap();
        asm.forward(0.3).unwrap();
        assert_abs_diff_eq!(asm.gears[1].phase, -0.3, epsilon = 1e-12);
        let end = asm.set_phase(0.).unwrap();
        assert_abs_diff_eq!(end[0], start[0], epsilon = 1e-9);
        assert_abs_diff_eq!(end[1], start[1], epsilon = 1e-9);
    }

    #[test]
    fn open_dyad() {
        let mut asm = pair();
        asm.lens = vec![20., 20.];
        assert_eq!(asm.pose(), Err(GeoError::NoIntersection));
        let asm = asm.with_policy(Policy::ClampToMidpoint);
        let pose = asm.pose().unwrap();
        assert_abs_diff_eq!(pose.joint[0], 60., epsilon = 1e-9);
        assert!(pair().with_policy(Policy::Strict).check().is_ok());
    }
}
