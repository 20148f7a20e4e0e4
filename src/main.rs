use anyhow::Context;
use clap::{Parser, ValueEnum};

use chip8_vm::{Emulator, Quirks};

mod app;
mod keymap;

#[derive(Clone, Copy, ValueEnum)]
enum QuirkSet {
    /// What most ROMs written after the 90s expect
    Modern,
    /// Behaviour of the original COSMAC VIP interpreter
    Cosmac,
}

impl From<QuirkSet> for Quirks {
    fn from(set: QuirkSet) -> Self {
        match set {
            QuirkSet::Modern => Quirks::default(),
            QuirkSet::Cosmac => Quirks::cosmac(),
        }
    }
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// ROM file to load
    #[clap(value_parser)]
    filename: String,

    /// Instructions executed per second
    #[clap(long, value_parser = clap::value_parser!(u32).range(1..), default_value_t = 540)]
    clock: u32,

    /// Interpreter behaviour for ambiguous instructions
    #[clap(long, value_enum, default_value_t = QuirkSet::Modern)]
    quirks: QuirkSet,

    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(long)]
    debug: bool,
}

fn main() -> Result<(), anyhow::Error> {
    // parse command-line arguments
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // read the rom
    let rom = std::fs::read(&cli.filename)
        .with_context(|| format!("error opening rom file: {}", &cli.filename))?;

    // build the emulator
    let emu = Emulator::with_rom(&rom)
        .context("error loading rom")?
        .with_quirks(cli.quirks.into());
    log::info!("loaded {} ({} bytes)", &cli.filename, rom.len());

    // run
    app::run(emu, &rom, cli.clock)?;
    Ok(())
}
