use crate::geo::GeoError;

/// Result type of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors of the mechanism model, the solver and the synthesis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A geometric primitive failed outside of the solver.
    #[error(transparent)]
    Geo(#[from] GeoError),
    /// A point cannot be placed in the current configuration.
    #[error("forward kinematics failed at point {point}: {source}")]
    ForwardKinematics {
        /// Point index
        point: usize,
        /// Cause of the failure
        source: GeoError,
    },
    /// A point has more constraints than it can satisfy.
    #[error("point {point} is over-constrained ({count} constraints)")]
    Overconstrained {
        /// Point index
        point: usize,
        /// Number of constraints on the point
        count: usize,
    },
    /// A point has one incoming link and no guide.
    #[error("point {point} is under-constrained")]
    Underconstrained {
        /// Point index
        point: usize,
    },
    /// The listed points wait on each other.
    #[error("cyclic constraints between points {0:?}")]
    Cyclic(Vec<usize>),
    /// The driving angle left its range.
    #[error("driving angle {theta:.4} is outside of [{min:.4}, {max:.4}]")]
    OutOfRange {
        /// Requested angle
        theta: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// An index refers to nothing.
    #[error("unknown point {0}")]
    UnknownPoint(usize),
    /// An assembly or a body index refers to nothing.
    #[error("unknown {kind} {id}")]
    UnknownElement {
        /// Element kind
        kind: &'static str,
        /// Index
        id: usize,
    },
    /// The mechanism has no crank to turn.
    #[error("the mechanism has no crank")]
    NoDriver,
    /// A gear assembly is malformed.
    #[error("invalid assembly: {0}")]
    InvalidAssembly(&'static str),
    /// A design file cannot be turned into a mechanism.
    #[error("invalid design file: {0}")]
    LoadFormat(String),
    /// No candidate in the sweep reproduces the poses.
    #[error("no feasible linkage for joint {joint}")]
    SynthesisUnsatisfiable {
        /// Middle joint of the failing triple
        joint: usize,
    },
}

impl Error {
    /// Errors of the topology, independent of the current configuration.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Overconstrained { .. }
                | Self::Underconstrained { .. }
                | Self::Cyclic(_)
                | Self::UnknownPoint(_)
                | Self::UnknownElement { .. }
                | Self::NoDriver
                | Self::InvalidAssembly(_)
                | Self::LoadFormat(_)
        )
    }

    /// Errors of the current configuration, a step in the other direction
    /// may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Geo(_) | Self::ForwardKinematics { .. } | Self::OutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let e = Error::ForwardKinematics { point: 3, source: GeoError::NoIntersection };
        assert_eq!(
            e.to_string(),
            "forward kinematics failed at point 3: the circles have no intersection"
        );
        assert!(e.is_recoverable());
        assert!(!e.is_structural());
        let e = Error::Cyclic(vec![2, 4]);
        assert_eq!(e.to_string(), "cyclic constraints between points [2, 4]");
        assert!(e.is_structural());
        let e = Error::from(GeoError::Degenerate("parallel lines"));
        assert_eq!(e.to_string(), "degenerate input: parallel lines");
    }
}
