use super::{has_ext, read, save_design, write, AnyResult};
use linkage::syn::{self, Linkage, SynCfg};
use std::{path::PathBuf, time::Instant};

#[derive(clap::Args)]
pub(super) struct Syn {
    /// Poses of the chain (.csv), one pose per row
    file: PathBuf,
    /// Output design file (.xml)
    #[clap(short, long)]
    out: Option<PathBuf>,
    /// Synthesis report (.ron)
    #[clap(long)]
    report: Option<PathBuf>,
    #[clap(flatten)]
    cfg: SynCfg,
}

// Summary of a synthesis run
#[derive(serde::Serialize)]
struct Report<'a> {
    source: String,
    driver: usize,
    angle_range: [f64; 2],
    angles: &'a [f64],
    linkages: &'a [Linkage],
    cfg: &'a SynCfg,
}

pub(super) fn syn(syn: Syn) -> AnyResult {
    let Syn { file, out, report, cfg } = syn;
    has_ext(&file, "csv")?;
    let poses = linkage::csv::parse_poses(&read(&file)?)?;
    log::info!("{} poses of {} points", poses.len(), poses.first().map_or(0, Vec::len));
    let t0 = Instant::now();
    let s = syn::synthesize(&poses, &cfg)?;
    log::info!(
        "driver={}, linkages={}, spent {:.3?}",
        s.driver,
        s.linkages.len(),
        t0.elapsed()
    );
    for l in &s.linkages {
        log::info!("joint {}: offset={:.4}, follower={:.4}", l.joint, l.offset, l.follower);
    }
    if let Some(path) = report {
        has_ext(&path, "ron")?;
        let report = Report {
            source: file.display().to_string(),
            driver: s.driver,
            angle_range: s.angle_range,
            angles: &s.angles,
            linkages: &s.linkages,
            cfg: &cfg,
        };
        write(&path, &ron::ser::to_string_pretty(&report, Default::default())?)?;
    }
    if let Some(path) = out {
        save_design(&path, &s.mech)?;
    }
    Ok(())
}
