#![forbid(unsafe_code)]
#![deny(warnings, clippy::all, clippy::pedantic)]

use std::io;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use gitstats::{
    Collaborators, CommitOrder, DefaultAnswer, GitRepository, Options, Prompt, ShellExecutor,
    StdinPrompt, TimeZonePolicy, run, setup_logger,
};

#[derive(Parser, Debug)]
#[command(version, about = "Run tasks against every commit of a git repository.")]
struct Args {
    /// Repository to clone (URL or local path)
    url: String,

    /// Only run this task (repeatable); names not in .gitstats.yml are ignored
    #[arg(short, long = "task", value_name = "NAME")]
    tasks: Vec<String>,

    /// Output format: csv (default) or json
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Process at most this many commits
    #[arg(short, long)]
    max: Option<usize>,

    /// Show a progress bar on stderr
    #[arg(short, long)]
    progress: bool,

    /// Walk history from the first commit instead of the latest
    #[arg(long)]
    oldest_first: bool,

    /// Print commit dates in UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// Delete the clone without asking
    #[arg(short = 'n', long)]
    no_interaction: bool,

    /// Log progress to stderr (-vv for debug output)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logger(args.verbose);

    let opts = Options {
        url: args.url,
        tasks: args.tasks,
        format: args.format,
        max: args.max,
        progress: args.progress,
        order: if args.oldest_first {
            CommitOrder::OldestFirst
        } else {
            CommitOrder::NewestFirst
        },
        time_zone: if args.utc {
            TimeZonePolicy::Utc
        } else {
            TimeZonePolicy::Local
        },
    };

    let repo: GitRepository = GitRepository::default();
    let prompt: &dyn Prompt = if args.no_interaction {
        &DefaultAnswer
    } else {
        &StdinPrompt
    };
    let deps = Collaborators {
        repo: &repo,
        executor: &ShellExecutor,
        prompt,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(&opts, &deps, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
