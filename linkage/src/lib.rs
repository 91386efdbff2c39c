//! Linkage is a simulator and a synthesis tool for planar articulated
//! linkages: ground pivots, rigid links, gear-driven dyads and cranks.
//!
//! ```
//! use linkage::{FourBar, SimCfg, Simulator};
//!
//! let mech = FourBar::example().to_mech().unwrap();
//! let mut sim = Simulator::new(mech, SimCfg::default());
//! sim.track(4).unwrap();
//! for _ in 0..10 {
//!     sim.tick().unwrap();
//! }
//! ```
#![cfg_attr(doc_cfg, feature(doc_cfg))]
#![warn(missing_docs)]
pub use crate::{error::*, geo::*, mech::*, point::*, sim::*};

#[cfg(feature = "csv")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "csv")))]
pub mod csv;
#[cfg(feature = "xml")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "xml")))]
pub mod design;
mod error;
mod geo;
mod mech;
mod point;
mod sim;
pub mod solver;
pub mod syn;
#[cfg(test)]
mod tests;
