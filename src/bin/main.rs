use chip8vm::{Config, Emulator, HEIGHT, WIDTH};
use clap::Parser;
use slog::{error, info, Logger};
use sloggers::types::Severity;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Headless runner: loads a ROM, runs it for a while and prints the final screen
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(help = "Path to the ROM file to run")]
    rom: PathBuf,

    #[arg(short, long, default_value_t = 10_000, help = "Stop after this many cycles, 0 runs forever")]
    max_cycles: u64,

    #[arg(short, long, default_value_t = 10, help = "Cycles executed between display polls")]
    cycles_per_frame: u32,

    #[arg(short, long, help = "Seed for the CXNN random source")]
    seed: Option<u64>,

    #[arg(short, long, default_value = "info", help = "trace, debug, info, warning, error or critical")]
    log_level: Severity,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            log_level: args.log_level,
            rng_seed: args.seed,
            cycles_per_frame: args.cycles_per_frame,
            max_cycles: if args.max_cycles == 0 { None } else { Some(args.max_cycles) },
        }
    }
}

fn main() {
    let args = Args::parse();
    let rom = args.rom.clone();
    let config = Config::from(args);

    let logger = match config.build_logger() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&rom, &config, logger) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(rom: &Path, config: &Config, logger: Logger) -> chip8vm::Result<()> {
    let mut emulator = Emulator::new(Some(logger.clone()));
    if let Some(seed) = config.rng_seed {
        emulator.seed_rng(seed);
    }

    let program = fs::read(rom)?;
    emulator.load_program(&program)?;
    info!(logger, "loaded rom"; "path" => rom.display().to_string(), "bytes" => program.len());

    let mut cycles: u64 = 0;
    let mut frames: u64 = 0;
    'run: loop {
        for _ in 0..config.cycles_per_frame.max(1) {
            if config.max_cycles.map_or(false, |max| cycles >= max) {
                break 'run;
            }

            if let Err(e) = emulator.cycle() {
                error!(logger, "emulation halted"; "cycles" => cycles, "error" => e.to_string());
                print_screen(&emulator);
                return Err(e);
            }
            cycles += 1;
        }

        if emulator.take_display_dirty() {
            frames += 1;
        }
    }

    info!(logger, "finished"; "cycles" => cycles, "frames" => frames,
        "unrecognized" => emulator.unrecognized_count());
    print_screen(&emulator);
    Ok(())
}

fn print_screen(emulator: &Emulator) {
    for row in emulator.get_pixels().chunks(WIDTH).take(HEIGHT) {
        let line: String = row.iter().map(|&on| if on { '#' } else { '.' }).collect();
        println!("{}", line);
    }
}
