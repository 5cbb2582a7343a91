use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dakdeck::{default_log_dir, init_logging};

#[derive(Parser, Debug)]
#[command(name = "dakdeck")]
#[command(about = "Builds, runs and drives Dakota studies from YAML study files")]
struct Args {
    /// Directory of dakdeck.log (default: ~/.dakdeck/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the input deck of a study file, or write it with --output
    Render {
        study: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Command line recorded in the deck header
        #[arg(long)]
        label: Option<String>,
    },

    /// Run the solver on a study file
    Run {
        study: PathBuf,

        /// Follow with one refinement run; without N the method picks the batch size
        #[arg(long, value_name = "N", num_args = 0..=1)]
        refine: Option<Option<u32>>,
    },

    /// Evaluate one parameter set; called by driver.sh
    Drive {
        params: PathBuf,
        results: PathBuf,

        /// Study options file (default: study_options.json next to PARAMS)
        #[arg(long)]
        options: Option<PathBuf>,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let log_dir = args.log_dir.unwrap_or_else(default_log_dir);
    init_logging(&log_dir, &args.log_level)?;

    match args.command {
        Command::Render {
            study,
            output,
            label,
        } => {
            if let Some(text) = dakdeck::render(&study, output.as_deref(), label.as_deref())? {
                print!("{text}");
            }
        }
        Command::Run { study, refine } => {
            let summary = dakdeck::run(&study, refine)?;
            for report in &summary.reports {
                println!("report: {}", report.display());
            }
            if let Some(moments) = &summary.moments {
                println!("{:<16} {}", "function", moments.columns().join("  "));
                for name in moments.rows() {
                    let values: Vec<String> = moments
                        .row(name)
                        .unwrap_or_default()
                        .iter()
                        .map(|x| format!("{x:.6e}"))
                        .collect();
                    println!("{name:<16} {}", values.join("  "));
                }
            }
        }
        Command::Drive {
            params,
            results,
            options,
        } => {
            dakdeck::drive(&params, &results, options.as_deref())?;
        }
    }

    tracing::debug!("dakdeck finished");
    Ok(())
}
