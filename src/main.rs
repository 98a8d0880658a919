use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{ensure, Context};
use clap::{Parser, ValueEnum};
use lochip::{ByteIsa, Cpu, Display, InstructionSet, Key, Keypad, Program, WordIsa};
use log::info;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Isa {
    /// 16-bit registers A, X, Y and I with carry, negative and zero flags
    Word,
    /// 8-bit registers Rx and Ry, flag register F, timers, keypad and sprites
    #[default]
    Byte,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(value_name = "PATH", help = "Program image to load", value_hint = clap::ValueHint::FilePath)]
    program: PathBuf,
    #[arg(long, value_enum, default_value_t, help = "Instruction set to interpret the program with")]
    isa: Isa,
    #[arg(short = 'n', long, value_name = "N", help = "Stop after N instructions")]
    max_instructions: Option<u64>,
    #[arg(long, default_value_t = lochip::SCREEN_WIDTH, help = "Display width in pixels")]
    width: usize,
    #[arg(long, default_value_t = lochip::SCREEN_HEIGHT, help = "Display height in pixels")]
    height: usize,
    #[arg(short, long, value_name = "LABELS", help = "Keys held down before the program starts, e.g. \"1qv\"")]
    keys: Option<String>,
    #[arg(long, help = "Log every executed instruction at debug level")]
    trace: bool,
    #[arg(long, help = "Report a sprite collision if any drawn pixel was already on")]
    sticky_collision: bool,
    #[arg(long, help = "Print registers and used memory after the run")]
    dump_memory: bool,
    #[arg(long, help = "Print the display after the run")]
    show_display: bool,
}

fn keypad(labels: Option<&str>) -> anyhow::Result<Keypad> {
    let keypad = Keypad::new();
    for label in labels.unwrap_or_default().chars() {
        let key = Key::from_label(&label.to_string())
            .with_context(|| format!("unknown key label {:?}", label))?;
        keypad.keydown(key);
    }
    Ok(keypad)
}

fn run<I: InstructionSet>(args: &Args) -> anyhow::Result<()> {
    ensure!(
        args.width > 0 && args.height > 0,
        "display size {}x{} must not be empty",
        args.width,
        args.height
    );
    let display = Arc::new(Display::new(args.width, args.height));
    let keypad = Arc::new(keypad(args.keys.as_deref()).context("press keys")?);

    let program = Program::from_file(&args.program).context("load program")?;
    ensure!(
        !program.is_empty(),
        "program image {} is empty",
        args.program.display()
    );

    let mut cpu = Cpu::<I>::with_devices(&program, display.clone(), keypad)
        .trace_operations(args.trace)
        .sticky_collision(args.sticky_collision);

    let cycles = match args.max_instructions {
        Some(max) => cpu.run_for(max),
        None => cpu.run(),
    };
    info!("stopped at {:#06x} after {} instructions", cpu.pc(), cycles);

    if args.dump_memory {
        println!("{}", cpu);
    }
    if args.show_display {
        println!("{}", display);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let result = match args.isa {
        Isa::Word => run::<WordIsa>(&args),
        Isa::Byte => run::<ByteIsa>(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
