use linkage::{design::Header, FourBar, Mechanism};
use std::path::{Path, PathBuf};

mod sim;
mod syn;

const APP_NAME: &str = env!("CARGO_BIN_NAME");
const FORMAT_VERSION: &str = "1.0";

type AnyResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug)]
enum CliErr {
    // Unsupported extension
    Format(PathBuf),
    // Reading or writing a file
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for CliErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Format(path) => write!(f, "unsupported format: {}", path.display()),
            Self::Io(path, e) => write!(f, "{}: {e}", path.display()),
        }
    }
}

impl std::error::Error for CliErr {}

#[derive(clap::Parser)]
#[clap(name = APP_NAME, version, author, about)]
pub(crate) struct Entry {
    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Subcommand)]
enum Cmd {
    /// Animate a design file and dump the traced paths
    Sim(sim::Sim),
    /// Synthesize a mechanism from the poses of an open chain
    Syn(syn::Syn),
    /// Load a design file and solve its current pose
    Check {
        /// Design file (.xml)
        file: PathBuf,
    },
    /// Write the example four-bar linkage as a design file
    Example {
        /// Output design file (.xml)
        out: PathBuf,
    },
}

impl Entry {
    pub(super) fn main() {
        let entry = <Self as clap::Parser>::parse_from(wild::args());
        register_panic_hook();
        let res = match entry.cmd {
            Cmd::Sim(sim) => sim::sim(sim),
            Cmd::Syn(syn) => syn::syn(syn),
            Cmd::Check { file } => check(&file),
            Cmd::Example { out } => example(&out),
        };
        if let Err(e) = res {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}

fn register_panic_hook() {
    // Print panic messages without stack trace
    std::panic::set_hook(Box::new(|info| {
        match info.payload().downcast_ref::<&str>() {
            Some(s) => eprintln!("{s}"),
            None => eprintln!("{info}"),
        }
        std::process::exit(1);
    }));
}

fn read(path: &Path) -> AnyResult<String> {
    std::fs::read_to_string(path).map_err(|e| CliErr::Io(path.to_path_buf(), e).into())
}

fn write(path: &Path, s: &str) -> AnyResult {
    std::fs::write(path, s).map_err(|e| CliErr::Io(path.to_path_buf(), e).into())
}

fn has_ext(path: &Path, ext: &str) -> AnyResult {
    match path.extension().and_then(|s| s.to_str()) {
        Some(e) if e.eq_ignore_ascii_case(ext) => Ok(()),
        _ => Err(CliErr::Format(path.to_path_buf()).into()),
    }
}

fn load_design(path: &Path) -> AnyResult<Mechanism> {
    has_ext(path, "xml")?;
    let (header, mech) = linkage::design::load(&read(path)?)?;
    let Header { author, version, date } = header;
    log::debug!("{}: author={author:?}, version={version:?}, date={date:?}", path.display());
    Ok(mech)
}

// Stamp the header and write
fn save_design(path: &Path, mech: &Mechanism) -> AnyResult {
    has_ext(path, "xml")?;
    let header = Header {
        author: APP_NAME.to_string(),
        version: FORMAT_VERSION.to_string(),
        date: chrono::Local::now().format("%m/%d/%Y").to_string(),
    };
    write(path, &linkage::design::save(&header, mech)?)?;
    log::info!("saved {}", path.display());
    Ok(())
}

fn check(path: &Path) -> AnyResult {
    let mut mech = load_design(path)?;
    let rules = mech.check()?;
    for (id, rule) in rules.iter().enumerate() {
        log::info!("point {id}: {rule:?}");
    }
    mech.forward_kinematics()?;
    if let Some(theta) = mech.angle() {
        log::info!("crank angle {:.4}°", theta.to_degrees());
    }
    for (id, [x, y]) in mech.positions().into_iter().enumerate() {
        println!("{id},{x},{y}");
    }
    Ok(())
}

fn example(path: &Path) -> AnyResult {
    save_design(path, &FourBar::example().to_mech()?)
}
