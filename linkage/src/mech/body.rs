use super::Mechanism;
use crate::{Frame, Result};

/// Rigid polygon carried by two joints.
///
/// The polygon is stored in the frame from `pivots[0]` toward `pivots[1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Joints defining the frame
    pub pivots: [usize; 2],
    /// Vertices in the local frame
    pub polygon: Vec<[f64; 2]>,
}

impl Body {
    /// Create a body from world coordinates at the current configuration.
    pub fn from_world(mech: &Mechanism, pivots: [usize; 2], world: &[[f64; 2]]) -> Result<Self> {
        let frame = Self::frame_of(mech, pivots)?;
        let polygon = world.iter().map(|p| frame.to_local(*p)).collect();
        Ok(Self { pivots, polygon })
    }

    /// Current frame of the body.
    pub fn frame(&self, mech: &Mechanism) -> Result<Frame> {
        Self::frame_of(mech, self.pivots)
    }

    /// Vertices in world coordinates.
    pub fn world_polygon(&self, mech: &Mechanism) -> Result<Vec<[f64; 2]>> {
        let frame = self.frame(mech)?;
        Ok(self.polygon.iter().map(|p| frame.to_world(*p)).collect())
    }

    fn frame_of(mech: &Mechanism, [a, b]: [usize; 2]) -> Result<Frame> {
        Ok(Frame::toward(mech.pos(a)?, mech.pos(b)?))
    }
}
