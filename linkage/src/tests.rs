use crate::*;
use approx::assert_abs_diff_eq;

fn assert_pos_eq(a: [f64; 2], b: [f64; 2], eps: f64) {
    assert_abs_diff_eq!(a[0], b[0], epsilon = eps);
    assert_abs_diff_eq!(a[1], b[1], epsilon = eps);
}

// Runs until `n` bounces, returns the number of moves
fn run_bounces(sim: &mut Simulator, n: usize) -> usize {
    let (mut bounces, mut moves) = (0, 0);
    while bounces < n {
        match sim.tick().unwrap() {
            Outcome::Moved => moves += 1,
            Outcome::Bounced(e) => {
                assert!(matches!(e, Error::OutOfRange { .. }));
                bounces += 1;
            }
        }
        assert!(moves < 10_000, "never bounced");
    }
    moves
}

#[test]
fn four_bar_cycle() {
    let mech = FourBar::example().to_mech().unwrap();
    let start = mech.joints[4].pos;
    let mut sim = Simulator::new(mech, SimCfg { speed: -0.02, trace_len: 1000 });
    sim.track(4).unwrap();
    let first = run_bounces(&mut sim, 2);
    // Down to 50° and back up to 140°
    assert_eq!(first, 156);
    assert_pos_eq(sim.mech().joints[4].pos, start, 1e-6);
    assert_eq!(sim.speed(), -0.02);
    let second = run_bounces(&mut sim, 2);
    assert_eq!(first, second);
    let path = sim.trace().path(4).unwrap();
    assert_eq!(path.len(), first + second);
    for i in 0..first {
        assert_pos_eq(path[i], path[first + i], 1e-6);
    }
}

#[test]
fn step_reversibility() {
    let mut m = FourBar::example().to_mech().unwrap();
    m.set_angle(100f64.to_radians()).unwrap();
    let before = m.positions();
    m.step_forward(0.05).unwrap();
    m.step_forward(-0.05).unwrap();
    for (a, b) in m.positions().into_iter().zip(before) {
        assert_pos_eq(a, b, 1e-9);
    }
    m.step_backward(0.05).unwrap();
    assert_abs_diff_eq!(m.angle().unwrap(), 100f64.to_radians() - 0.05, epsilon = 1e-12);
}

#[test]
fn failed_step_restores() {
    let mut m = FourBar { range: None, l1: 120., ..FourBar::example() }
        .to_mech()
        .unwrap();
    let before = m.clone();
    // The follower tip cannot close beyond this angle
    let mut last = Ok(());
    for _ in 0..400 {
        last = m.step(0.02);
        if last.is_err() {
            break;
        }
    }
    let e = last.unwrap_err();
    assert!(matches!(e, Error::ForwardKinematics { point: 3, .. }));
    assert!(e.is_recoverable());
    assert_ne!(m, before);
    let snapshot = m.clone();
    assert!(m.step(0.02).is_err());
    assert_eq!(m, snapshot);
}

#[test]
fn gear_driven() {
    let mut m = Mechanism::new();
    let a = m.add_point([431., 282.]);
    let b = m.add_point([506., 287.]);
    let ee = m.add_point([0., 0.]);
    let gears = vec![
        Gear::new(m.joints[a].pos, 29.45).with_phase(0.4),
        Gear::new(m.joints[b].pos, 39.68).with_phase(std::f64::consts::PI + 0.2).with_speed(-1.),
    ];
    let asm = Assembly::new(gears, [0, 1], vec![120., 120., 20.], ee);
    m.joints[ee].pos = asm.end_effector_pos().unwrap();
    m.add_assembly(asm).unwrap();
    let c = m.add_point([340., 120.]);
    m.add_guided_link(ee, c, a).unwrap();
    let start = m.positions();
    for _ in 0..10 {
        m.step(0.03).unwrap();
    }
    assert_abs_diff_eq!(m.assemblies[0].phase, 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(m.assemblies[0].gears[1].phase, std::f64::consts::PI - 0.1, epsilon = 1e-12);
    m.set_driving_phase(0, 0.).unwrap();
    for (p, q) in m.positions().into_iter().zip(start) {
        assert_pos_eq(p, q, 1e-9);
    }
    let pose = m.assemblies[0].pose().unwrap();
    assert_pos_eq(pose.end, m.joints[ee].pos, 1e-12);
    assert!(m.set_driving_phase(3, 0.).is_err());
}

#[test]
fn dangling_end_effector() {
    let mut m = Mechanism::new();
    let a = m.add_point([0., 0.]);
    let b = m.add_point([100., 0.]);
    let ee = m.add_point([0., 0.]);
    let gears = vec![Gear::new(m.joints[a].pos, 20.), Gear::new(m.joints[b].pos, 20.)];
    let asm = Assembly::new(gears, [0, 1], vec![80., 80., 10.], ee);
    m.joints[ee].pos = asm.end_effector_pos().unwrap();
    m.add_assembly(asm).unwrap();
    m.assemblies[0].end_effector = 99;
    assert_eq!(m.step(0.1), Err(Error::UnknownPoint(99)));
    assert_eq!(m.set_driving_phase(0, 0.5), Err(Error::UnknownPoint(99)));
}

#[test]
fn drag_edit() {
    let mut m = FourBar::example().to_mech().unwrap();
    m.move_point(1, [320., 200.]).unwrap();
    let p = m.positions();
    assert_abs_diff_eq!(m.links[1].len, p[1].dist(&p[3]), epsilon = 1e-9);
    assert_eq!(p[1], [320., 200.]);
    // Crank tip beyond 140°
    let before = m.clone();
    let e = m.move_point(2, [300., 300.]).unwrap_err();
    assert!(matches!(e, Error::OutOfRange { .. }));
    assert_eq!(m, before);
}

#[test]
fn body_follows_pivots() {
    let mut m = FourBar::example().to_mech().unwrap();
    let p = m.positions();
    let tri = [p[2], p[3], p[4]];
    let body = Body::from_world(&m, [2, 3], &tri).unwrap();
    m.add_body(body).unwrap();
    m.set_angle(90f64.to_radians()).unwrap();
    let p = m.positions();
    let poly = m.body_polygon(0).unwrap();
    assert_pos_eq(poly[0], p[2], 1e-9);
    assert_pos_eq(poly[2], p[4], 1e-9);
}

// Crank 0-1, follower pivot on the x axis, coupler extended to 2, 3 rigid
fn truth() -> (Mechanism, [usize; 4]) {
    let range = [60f64.to_radians(), 120f64.to_radians()];
    let p0 = [0., 0.];
    let p1 = p0.pla(50., range[0]);
    let g = [-100., 0.];
    let q = pllp(p1, 100., g, 120., Branch::Side(Side::Left), p1).unwrap();
    let p2 = p1.extend(80., 0., &q);
    let p3 = p2.extend(60., 0.5, &p1);
    let mut m = Mechanism::new();
    let [i0, i1, ig, iq, i2, i3] = [p0, p1, g, q, p2, p3].map(|p| m.add_point(p));
    m.joints[iq].branch = Branch::Side(Side::Left);
    m.add_link(i1, iq).unwrap();
    m.add_link(ig, iq).unwrap();
    m.add_guided_link(i1, i2, iq).unwrap();
    m.add_guided_link(i2, i3, i1).unwrap();
    m.set_crank(i0, i1, Some(range)).unwrap();
    m.forward_kinematics().unwrap();
    (m, [i0, i1, i2, i3])
}

// Chain positions at both ends of the crank range
fn truth_poses() -> Vec<Vec<[f64; 2]>> {
    let (mut m, chain) = truth();
    [60f64, 120.]
        .into_iter()
        .map(|deg| {
            m.set_angle(deg.to_radians()).unwrap();
            chain.map(|i| m.joints[i].pos).to_vec()
        })
        .collect()
}

#[test]
fn synthesis_reproduces_poses() {
    let poses = truth_poses();
    let s = syn::synthesize(&poses, &syn::SynCfg::default()).unwrap();
    assert_eq!(s.driver, 0);
    assert_eq!(s.linkages.len(), 1);
    assert_eq!(s.linkages[0].joint, 1);
    // First candidate of the sweep that fits both poses
    assert_eq!(s.linkages[0].offset, 80.);
    assert_abs_diff_eq!(s.angle_range[0], 60f64.to_radians(), epsilon = 1e-9);
    assert_abs_diff_eq!(s.angle_range[1], 120f64.to_radians(), epsilon = 1e-9);
    // Chain lengths are kept
    let links = &s.mech.links;
    let len_of = |a, b| links.iter().find(|l| l.start == a && l.end == b).map(|l| l.len);
    assert_abs_diff_eq!(s.mech.crank.as_ref().unwrap().len, 50., epsilon = 1e-9);
    assert_abs_diff_eq!(len_of(1, 2).unwrap(), 80., epsilon = 1e-9);
    assert_abs_diff_eq!(len_of(2, 3).unwrap(), 60., epsilon = 1e-9);
    // Animate from the first pose to the last one
    let ticks = 40;
    let speed = (s.angle_range[1] - s.angle_range[0]) / ticks as f64;
    let mut sim = Simulator::new(s.mech.clone(), SimCfg { speed, ..SimCfg::default() });
    for k in 0..4 {
        assert_pos_eq(sim.mech().joints[k].pos, poses[0][k], 1e-6);
    }
    for _ in 0..ticks {
        assert_eq!(sim.tick().unwrap(), Outcome::Moved);
    }
    for k in 0..4 {
        assert_pos_eq(sim.mech().joints[k].pos, poses[1][k], 1e-6);
    }
}

#[test]
fn synthesis_pinned_offset() {
    let poses = truth_poses();
    // The coupler length of the ground truth recovers its follower
    let cfg = syn::SynCfg { offset: Some(100.), ..syn::SynCfg::default() };
    let s = syn::synthesize(&poses, &cfg).unwrap();
    let l = &s.linkages[0];
    assert_eq!(l.offset, 100.);
    assert_abs_diff_eq!(l.follower, 120., epsilon = 1e-6);
    assert_pos_eq(s.mech.joints[l.pivot].pos, [-100., 0.], 1e-6);
}

#[test]
fn synthesis_unsatisfiable() {
    let poses = truth_poses();
    // A zero-length coupler offset cannot carry the joint
    let cfg = syn::SynCfg { offset: Some(0.), ..syn::SynCfg::default() };
    let e = syn::synthesize(&poses, &cfg).unwrap_err();
    assert_eq!(e, Error::SynthesisUnsatisfiable { joint: 1 });
}
