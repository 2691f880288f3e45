use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser as Clap_parser;
use pixbright::config::load_config;
use pixbright::pipeline::run_adjustment;
use pixbright::{AdjustKind, Adjustment, OutputFormat};

#[derive(Clap_parser, Debug, Clone)]
#[command(author, version, about = "Adjust the brightness of an image in parallel", long_about = None)]
struct Args {
    /// brightness | contrast
    #[arg(name = "adjust type", value_name = "ADJUST_TYPE")]
    adjust_type: AdjustKind,

    /// percentage, 25 makes the image 25% brighter
    #[arg(name = "adjust amount", value_name = "AMOUNT", allow_negative_numbers = true)]
    amount: i32,

    /// image to read, relative to the working directory
    #[arg(name = "image path", value_name = "IMAGE_PATH")]
    image_path: PathBuf,

    #[arg(short, long = "config", value_name = "CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// directory for the result, must already exist
    #[arg(short, long = "output-dir", value_name = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// fixed concurrency budget instead of probing `ulimit -n`
    #[arg(short, long, value_name = "N")]
    budget: Option<usize>,
}

fn run(args: Args) -> anyhow::Result<PathBuf> {
    let mut config = load_config(args.config_path.as_deref()).context("loading config")?;
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.budget.is_some() {
        config.budget.limit = args.budget;
    }

    let adjustment = Adjustment::new(args.adjust_type, args.amount);
    let output = run_adjustment(&args.image_path, adjustment, &config)?;
    Ok(output)
}

fn main() -> ExitCode {
    let args = Args::parse();
    // stderr is reserved for the one-line failure diagnostic
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    match run(args) {
        Ok(output) => {
            log::info!("wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
