use super::{has_ext, load_design, write, AnyResult};
use linkage::{solver::Rule, Outcome, SimCfg, Simulator};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct Sim {
    /// Design file (.xml)
    file: PathBuf,
    /// Number of ticks
    #[clap(long, default_value_t = 400)]
    steps: usize,
    /// Traced joints, default to every moving joint
    #[clap(long = "track")]
    tracks: Vec<usize>,
    /// Output trace (.csv), default to stdout
    #[clap(short, long)]
    out: Option<PathBuf>,
    #[clap(flatten)]
    cfg: SimCfg,
}

pub(super) fn sim(sim: Sim) -> AnyResult {
    let Sim { file, steps, tracks, out, cfg } = sim;
    log::info!("speed={}, trace_len={}, steps={steps}", cfg.speed, cfg.trace_len);
    let mut mech = load_design(&file)?;
    let tracks = if tracks.is_empty() {
        let rules = mech.check()?;
        let driven = |id| mech.assemblies.iter().any(|a| a.end_effector == id);
        (0..rules.len()).filter(|&id| rules[id] != Rule::Fixed || driven(id)).collect()
    } else {
        tracks
    };
    mech.forward_kinematics()?;
    let mut sim = Simulator::new(mech, cfg);
    for id in tracks {
        sim.track(id)?;
    }
    let mut bounces = 0;
    for _ in 0..steps {
        if let Outcome::Bounced(e) = sim.tick()? {
            bounces += 1;
            log::debug!("bounced: {e}");
        }
    }
    log::info!("{steps} ticks, {bounces} bounces");
    let csv = linkage::csv::dump_trace(sim.trace())?;
    match out {
        Some(path) => {
            has_ext(&path, "csv")?;
            write(&path, &csv)
        }
        None => {
            print!("{csv}");
            Ok(())
        }
    }
}
