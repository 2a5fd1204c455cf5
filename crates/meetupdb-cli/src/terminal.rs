//! Terminal side of the interactive edit session: prompts, colored diffs
//! and the external editor.

use std::error::Error as _;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;

use colored::Colorize;
use meetupdb::{Action, Console, Editor, MeetupError};
use tracing::debug;

/// A [`Console`] reading answers from `input` and writing to `output`.
pub struct TerminalConsole<R, W> {
    input: R,
    output: W,
}

impl TerminalConsole<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn print_help(&mut self, actions: &[Action]) -> io::Result<()> {
        for action in actions {
            writeln!(self.output, "{}: {}", action.key().to_string().yellow(), action.help())?;
        }
        writeln!(self.output, "{}: print this help", "?".yellow())
    }

    fn ask(&mut self, prompt: &str, actions: &[Action]) -> io::Result<Action> {
        let default = actions[0];
        let menu: Vec<String> = actions
            .iter()
            .map(|a| {
                if *a == default {
                    a.key().to_ascii_uppercase().to_string()
                } else {
                    a.key().to_string()
                }
            })
            .chain(std::iter::once("?".to_string()))
            .collect();

        loop {
            write!(self.output, "{} [{}] ", prompt.blue(), menu.join("/"))?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // End of input: nobody is left to answer
                writeln!(self.output)?;
                return Ok(Action::Quit);
            }
            let answer = line.trim().to_lowercase();

            if answer.is_empty() {
                return Ok(default);
            }
            if let Some(action) = actions.iter().find(|a| answer == a.key().to_string()) {
                return Ok(*action);
            }
            if answer != "?" && answer != "help" {
                writeln!(self.output, "{}", "Please select one of the options:".yellow())?;
            }
            self.print_help(actions)?;
        }
    }
}

impl<R: BufRead, W: Write> Console for TerminalConsole<R, W> {
    fn choose(&mut self, prompt: &str, actions: &[Action]) -> meetupdb::Result<Action> {
        match actions {
            [] => Ok(Action::Quit),
            [only] => Ok(*only),
            _ => self.ask(prompt, actions).map_err(|source| MeetupError::Io {
                path: "<stdin>".into(),
                source,
            }),
        }
    }

    fn show_diff(&mut self, diff: &str, preview: &str) {
        let _ = write_diff(&mut self.output, diff, preview);
    }

    fn show_error(&mut self, error: &MeetupError, detailed: bool) {
        let _ = write_error(&mut self.output, error, detailed);
    }
}

/// Write `diff` with added lines green, removed lines red and hunk headers
/// yellow. An empty diff shows the unchanged entry.
pub fn write_diff(out: &mut impl Write, diff: &str, preview: &str) -> io::Result<()> {
    if diff.is_empty() {
        writeln!(out, "{}", "No changes!".yellow())?;
        return write!(out, "{}", preview);
    }
    for line in diff.lines() {
        if line.starts_with('+') {
            writeln!(out, "{}", line.green())?;
        } else if line.starts_with('-') {
            writeln!(out, "{}", line.red())?;
        } else if line.starts_with('@') {
            writeln!(out, "{}", line.yellow())?;
        } else {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

fn write_error(out: &mut impl Write, error: &MeetupError, detailed: bool) -> io::Result<()> {
    writeln!(out, "{}", error.to_string().red())?;
    if detailed {
        writeln!(out, "{:#?}", error)?;
        let mut cause = error.source();
        while let Some(err) = cause {
            writeln!(out, "  caused by: {}", err)?;
            cause = err.source();
        }
    }
    Ok(())
}

/// Runs an editor command on the file and waits for it.
pub struct ExternalEditor {
    command: Vec<String>,
}

impl ExternalEditor {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Editor for ExternalEditor {
    fn edit(&mut self, path: &Path) -> meetupdb::Result<()> {
        let io_error = |source| MeetupError::Io {
            path: path.to_path_buf(),
            source,
        };
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| io_error(io::Error::other("no editor configured")))?;

        debug!(editor = %program, path = %path.display(), "Starting editor");
        let status = Command::new(program).args(args).arg(path).status().map_err(io_error)?;
        if !status.success() {
            return Err(io_error(io::Error::other(format!("editor '{}' exited with {}", program, status))));
        }
        Ok(())
    }
}
