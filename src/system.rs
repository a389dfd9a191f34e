use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

/// Runs one task command against the checked-out tree.
pub trait CommandExecutor {
    /// Run `command` through the shell with `dir` as the working directory and
    /// return what it printed. Failures are reported in the returned text.
    fn run(&self, dir: &Path, command: &str) -> String;
}

/// `sh -c <command>`. The captured text is stdout, then stderr on its own line
/// when non-empty, trimmed of surrounding whitespace. Exit status is ignored.
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn run(&self, dir: &Path, command: &str) -> String {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();
        match output {
            Ok(out) => {
                debug!(command, status = %out.status, "task finished");
                let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&out.stderr);
                if !stderr.trim().is_empty() {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str(&stderr);
                }
                text.trim().to_string()
            }
            Err(err) => format!("failed to run '{command}': {err}"),
        }
    }
}

/// Yes/no question asked once the run is over.
pub trait Prompt {
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Asks on stderr and reads one line from stdin. An empty answer or EOF takes
/// the default.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{question} {hint} ");
        let _ = stderr.flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => default,
            Ok(_) => parse_answer(&answer).unwrap_or(default),
        }
    }
}

/// Never asks; always takes the default. Used with `--no-interaction`.
pub struct DefaultAnswer;

impl Prompt for DefaultAnswer {
    fn confirm(&self, _question: &str, default: bool) -> bool {
        default
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "y" | "yes" => Some(true),
        _ => Some(false),
    }
}
