//! Forward kinematics by constraint propagation.
//!
//! Every joint is classified by its incoming links ([`Rule`]), then the
//! joints are placed in queue order once their dependencies are placed.
use crate::{pllp, Error, Mechanism, Point, Result};
use std::collections::VecDeque;

/// How a joint gets its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Ground joint or a joint moved by an assembly.
    Fixed,
    /// Crank tip, placed from the crank pivot.
    Crank,
    /// Intersection of the circles of two incoming links, in slot order.
    Pllp([usize; 2]),
    /// Single incoming link with a guide.
    Guided(usize),
}

impl Rule {
    fn deps(&self, mech: &Mechanism) -> [Option<usize>; 2] {
        match *self {
            Self::Fixed => [None; 2],
            Self::Crank => [mech.crank.as_ref().map(|c| c.pivot), None],
            Self::Pllp([a, b]) => [Some(mech.links[a].start), Some(mech.links[b].start)],
            Self::Guided(l) => {
                let link = &mech.links[l];
                [Some(link.start), link.guide.map(|g| g.from)]
            }
        }
    }
}

/// Classify every joint, or report the first structural error.
pub fn rules(mech: &Mechanism) -> Result<Vec<Rule>> {
    let n = mech.joints.len();
    let mut incoming = vec![Vec::new(); n];
    for (i, link) in mech.links.iter().enumerate() {
        mech.pos(link.start)?;
        let list = incoming
            .get_mut(link.end)
            .ok_or(Error::UnknownPoint(link.end))?;
        list.push(i);
        if let Some(guide) = &link.guide {
            mech.pos(guide.from)?;
        }
    }
    let mut driven = vec![0; n];
    for id in mech.assemblies.iter().map(|a| a.end_effector) {
        *driven.get_mut(id).ok_or(Error::UnknownPoint(id))? += 1;
    }
    let crank_tip = match &mech.crank {
        Some(crank) => {
            mech.pos(crank.pivot)?;
            *driven.get_mut(crank.tip).ok_or(Error::UnknownPoint(crank.tip))? += 1;
            Some(crank.tip)
        }
        None => None,
    };
    incoming
        .into_iter()
        .zip(driven)
        .enumerate()
        .map(|(point, (mut links, driven))| {
            links.sort_by_key(|&i| (mech.links[i].slot, i));
            match (links.as_slice(), driven) {
                (&[], 0) => Ok(Rule::Fixed),
                (&[], 1) if crank_tip == Some(point) => Ok(Rule::Crank),
                (&[], 1) => Ok(Rule::Fixed),
                (&[l], 0) if mech.links[l].guide.is_some() => Ok(Rule::Guided(l)),
                (&[_], 0) => Err(Error::Underconstrained { point }),
                (&[a, b], 0) => Ok(Rule::Pllp([a, b])),
                _ => Err(Error::Overconstrained { point, count: links.len() + driven }),
            }
        })
        .collect()
}

/// Solve the positions of all joints without touching the mechanism.
pub fn solve(mech: &Mechanism) -> Result<Vec<[f64; 2]>> {
    let rules = rules(mech)?;
    let mut pos = mech.positions();
    let mut resolved = vec![false; pos.len()];
    let mut queue = VecDeque::with_capacity(pos.len());
    for (i, rule) in rules.iter().enumerate() {
        if *rule == Rule::Fixed {
            resolved[i] = true;
        } else {
            queue.push_back(i);
        }
    }
    // Number of deferrals since the last placement
    let mut stall = 0;
    while let Some(i) = queue.pop_front() {
        let ready = rules[i].deps(mech).iter().flatten().all(|&d| resolved[d]);
        if !ready {
            queue.push_back(i);
            stall += 1;
            if stall >= queue.len() {
                let mut ids = Vec::from(queue);
                ids.sort_unstable();
                return Err(Error::Cyclic(ids));
            }
            continue;
        }
        pos[i] = place(mech, rules[i], i, &pos)?;
        resolved[i] = true;
        stall = 0;
    }
    Ok(pos)
}

fn place(mech: &Mechanism, rule: Rule, i: usize, pos: &[[f64; 2]]) -> Result<[f64; 2]> {
    match rule {
        Rule::Fixed => Ok(pos[i]),
        Rule::Crank => {
            let crank = mech.crank.as_ref().ok_or(Error::NoDriver)?;
            Ok(crank.tip_pos(pos[crank.pivot]))
        }
        Rule::Pllp([a, b]) => {
            let (la, lb) = (&mech.links[a], &mech.links[b]);
            let (c1, c2) = (pos[la.start], pos[lb.start]);
            let joint = &mech.joints[i];
            pllp(c1, la.len, c2, lb.len, joint.branch, joint.expected())
                .map_err(|source| Error::ForwardKinematics { point: i, source })
        }
        Rule::Guided(l) => {
            let link = &mech.links[l];
            let guide = link.guide.ok_or(Error::Underconstrained { point: i })?;
            Ok(pos[link.start].extend(link.len, guide.angle, &pos[guide.from]))
        }
    }
}
