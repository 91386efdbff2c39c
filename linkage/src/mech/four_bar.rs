//! Planar four-bar linkages.
use super::Mechanism;
use crate::{Branch, Point, Result, Side};

/// Four-bar linkage with a coupler point, built into a [`Mechanism`].
///
/// # Joints
///
/// + `0` Driver pivot `p0`
/// + `1` Follower pivot `p1`
/// + `2` Crank tip
/// + `3` Follower tip, `l2` from the crank tip and `l1` from `p1`
/// + `4` Coupler point, `l3` from the crank tip and `l4` from the follower tip
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FourBar {
    /// Driver link pivot
    pub p0: [f64; 2],
    /// Follower link pivot
    pub p1: [f64; 2],
    /// Initial driver angle
    pub theta: f64,
    /// Length of the driver link
    pub l0: f64,
    /// Length of the follower link
    pub l1: f64,
    /// Length of the coupler link
    pub l2: f64,
    /// Distance of the coupler point from the crank tip
    pub l3: f64,
    /// Distance of the coupler point from the follower tip
    pub l4: f64,
    /// Branch sides of the follower tip and the coupler point
    #[cfg_attr(feature = "serde", serde(default))]
    pub sides: [Side; 2],
    /// Range of the driver angle, a full turn if none
    #[cfg_attr(feature = "serde", serde(default))]
    pub range: Option<[f64; 2]>,
}

impl Default for FourBar {
    fn default() -> Self {
        Self::example()
    }
}

impl FourBar {
    /// An example crank rocker, swinging between 50° and 140°.
    pub fn example() -> Self {
        Self {
            p0: [500., 200.],
            p1: [300., 200.],
            theta: 140f64.to_radians(),
            l0: 200.,
            l1: 250.,
            l2: 250.,
            l3: 150.,
            l4: 150.,
            sides: [Side::Left; 2],
            range: Some([50f64.to_radians(), 140f64.to_radians()]),
        }
    }

    /// Length of the ground link.
    pub fn ground(&self) -> f64 {
        self.p0.dist(&self.p1)
    }

    /// Build the mechanism and solve the initial configuration.
    pub fn to_mech(&self) -> Result<Mechanism> {
        let Self { p0, p1, theta, l0, l1, l2, l3, l4, sides, range } = *self;
        let mut m = Mechanism::new();
        m.add_point(p0);
        m.add_point(p1);
        m.add_point(p0.pla(l0, theta));
        m.add_point_with(p0, Branch::Side(sides[0]));
        m.add_point_with(p0, Branch::Side(sides[1]));
        for (start, end, len) in [(2, 3, l2), (1, 3, l1), (2, 4, l3), (3, 4, l4)] {
            let id = m.add_link(start, end)?;
            m.links[id].len = len;
        }
        m.set_crank(0, 2, range)?;
        m.forward_kinematics()?;
        Ok(m)
    }
}
