//! Command line front end of the linkage simulator.
mod cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    cli::Entry::main();
}
