use std::io::Write;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use git_crecord::refs::{FileRefs, parse_file_refs};
use git_crecord::{PatchRoot, RecordOptions, Recorder, RefError, format_listing, select_refs};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "git-crecord", version)]
#[command(about = "Select changes hunk by hunk or line by line and stage them")]
struct Cli {
    /// Run as if git was started in this directory
    #[arg(short = 'C', value_name = "DIR", default_value = ".", global = true)]
    dir: String,

    /// Log more (-v for git invocations, -vv for parser details)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List changed files, hunks and lines with their reference numbers
    List {
        /// Limit to these paths
        paths: Vec<String>,
    },
    /// Print the patch that `stage` would apply
    Filter {
        #[command(flatten)]
        selection: Selection,
    },
    /// Stage the selected changes in the index
    Stage {
        #[command(flatten)]
        selection: Selection,

        /// Only check that the patch applies
        #[arg(long)]
        check: bool,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Man,
}

#[derive(Args)]
struct Selection {
    /// Select only these changes (e.g. "src/lib.rs:2,3.1"); repeatable
    #[arg(long, value_name = "REF")]
    only: Vec<String>,

    /// Leave these changes out (e.g. "Cargo.lock" or "src/lib.rs:1"); repeatable
    #[arg(long, value_name = "REF")]
    skip: Vec<String>,

    /// Limit the diff to these paths
    paths: Vec<String>,
}

impl Selection {
    fn parse_refs(refs: &[String]) -> Result<Vec<FileRefs>, RefError> {
        refs.iter().map(|input| parse_file_refs(input)).collect()
    }

    /// Read the diff and apply the references to it.
    fn select(&self, recorder: &Recorder) -> Result<PatchRoot, Box<dyn std::error::Error>> {
        let only = Self::parse_refs(&self.only)?;
        let skip = Self::parse_refs(&self.skip)?;
        let patch = recorder.load()?;
        Ok(select_refs(patch, &only, &skip)?.into_root())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { paths } => {
            let recorder = Recorder::new(&cli.dir, RecordOptions { check: false, paths });
            print!("{}", format_listing(&recorder.load()?));
        }
        Commands::Filter { selection } => {
            let recorder = Recorder::new(
                &cli.dir,
                RecordOptions {
                    check: false,
                    paths: selection.paths.clone(),
                },
            );
            let patch = selection.select(&recorder)?;
            std::io::stdout().write_all(&patch.filter().to_bytes())?;
        }
        Commands::Stage { selection, check } => {
            let recorder = Recorder::new(
                &cli.dir,
                RecordOptions {
                    check,
                    paths: selection.paths.clone(),
                },
            );
            let patch = selection.select(&recorder)?;
            recorder.stage(&patch)?;
            if check {
                eprintln!("Patch applies cleanly");
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "git-crecord", &mut std::io::stdout());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
