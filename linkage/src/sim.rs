//! Animation driver: stepping, bouncing and tracing.
use crate::{Error, Mechanism, Result};
use std::collections::VecDeque;

/// Configuration of a [`Simulator`].
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[derive(Clone, Debug, PartialEq)]
pub struct SimCfg {
    /// Driving increment of a tick, in radians
    #[cfg_attr(
        feature = "clap",
        arg(long, default_value_t = SimCfg::default().speed, allow_hyphen_values = true)
    )]
    pub speed: f64,
    /// Number of samples kept on each traced path
    #[cfg_attr(feature = "clap", arg(long, default_value_t = SimCfg::default().trace_len))]
    pub trace_len: usize,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self { speed: 0.03, trace_len: 400 }
    }
}

/// Bounded paths of the traced joints.
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    cap: usize,
    paths: Vec<(usize, VecDeque<[f64; 2]>)>,
}

impl Trace {
    /// Create an empty trace keeping `cap` samples per path.
    pub fn new(cap: usize) -> Self {
        Self { cap, paths: Vec::new() }
    }

    /// Trace a joint, no-op if it is traced already.
    pub fn track(&mut self, id: usize) {
        if !self.paths.iter().any(|(i, _)| *i == id) {
            self.paths.push((id, VecDeque::with_capacity(self.cap)));
        }
    }

    /// Append the current positions of the traced joints.
    pub fn record(&mut self, mech: &Mechanism) {
        for (id, path) in &mut self.paths {
            let Some(joint) = mech.joints.get(*id) else { continue };
            if path.len() == self.cap {
                path.pop_front();
            }
            if self.cap > 0 {
                path.push_back(joint.pos);
            }
        }
    }

    /// Path of a joint, oldest sample first.
    pub fn path(&self, id: usize) -> Option<&VecDeque<[f64; 2]>> {
        self.paths.iter().find(|(i, _)| *i == id).map(|(_, p)| p)
    }

    /// All traced paths.
    pub fn paths(&self) -> impl Iterator<Item = (usize, &VecDeque<[f64; 2]>)> {
        self.paths.iter().map(|(i, p)| (*i, p))
    }

    /// Drop the recorded samples.
    pub fn clear(&mut self) {
        self.paths.iter_mut().for_each(|(_, p)| p.clear());
    }
}

/// Result of a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The mechanism moved.
    Moved,
    /// The step failed, the mechanism stayed and the direction is reversed.
    Bounced(Error),
}

/// Steps a mechanism back and forth within its feasible range.
#[derive(Clone, Debug)]
pub struct Simulator {
    mech: Mechanism,
    cfg: SimCfg,
    trace: Trace,
}

impl Simulator {
    /// Create a new simulator.
    pub fn new(mech: Mechanism, cfg: SimCfg) -> Self {
        let trace = Trace::new(cfg.trace_len);
        Self { mech, cfg, trace }
    }

    /// Trace a joint.
    pub fn track(&mut self, id: usize) -> Result<()> {
        self.mech.pos(id)?;
        self.trace.track(id);
        Ok(())
    }

    /// Current mechanism.
    pub fn mech(&self) -> &Mechanism {
        &self.mech
    }

    /// Mutable access of the mechanism, for the editing operations.
    pub fn mech_mut(&mut self) -> &mut Mechanism {
        &mut self.mech
    }

    /// Take the mechanism.
    pub fn into_mech(self) -> Mechanism {
        self.mech
    }

    /// Recorded paths.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Current signed speed.
    pub fn speed(&self) -> f64 {
        self.cfg.speed
    }

    /// Double the speed.
    pub fn faster(&mut self) {
        self.cfg.speed *= 2.;
    }

    /// Halve the speed.
    pub fn slower(&mut self) {
        self.cfg.speed *= 0.5;
    }

    /// Advance one tick along the current direction.
    pub fn tick(&mut self) -> Result<Outcome> {
        self.step_forward()
    }

    /// Step along the current direction.
    pub fn step_forward(&mut self) -> Result<Outcome> {
        self.advance(self.cfg.speed)
    }

    /// Step against the current direction.
    pub fn step_backward(&mut self) -> Result<Outcome> {
        self.advance(-self.cfg.speed)
    }

    fn advance(&mut self, step: f64) -> Result<Outcome> {
        match self.mech.step(step) {
            Ok(()) => {
                self.trace.record(&self.mech);
                Ok(Outcome::Moved)
            }
            Err(e) if e.is_recoverable() => {
                tracing::debug!(%e, speed = self.cfg.speed, "bounce");
                self.cfg.speed = -self.cfg.speed;
                Ok(Outcome::Bounced(e))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_trace() {
        let mut m = Mechanism::new();
        m.add_point([0., 0.]);
        let mut t = Trace::new(3);
        t.track(0);
        t.track(0);
        for x in 0..5 {
            m.joints[0].pos = [x as f64, 0.];
            t.record(&m);
        }
        let path = t.path(0).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.front(), Some(&[2., 0.]));
        assert_eq!(t.paths().count(), 1);
        t.clear();
        assert!(t.path(0).unwrap().is_empty());
    }

    #[test]
    fn speed() {
        let mut sim = Simulator::new(Mechanism::new(), SimCfg::default());
        sim.faster();
        assert_eq!(sim.speed(), 0.06);
        sim.slower();
        sim.slower();
        assert_eq!(sim.speed(), 0.015);
        assert!(sim.track(0).is_err());
    }
}
