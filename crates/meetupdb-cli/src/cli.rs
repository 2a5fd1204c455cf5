//! CLI argument definitions using clap.

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// meetupdb: query and edit a directory of meetup records
#[derive(Parser)]
#[command(name = "meetupdb")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(infer_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

#[derive(Args)]
pub struct GlobalOptions {
    /// Root of the data directory
    #[arg(long = "data", env = "MEETUPDB_DATA", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// SQLite file to keep the store in (default: in memory)
    #[arg(long = "db", env = "MEETUPDB_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Editor command for interactive edits
    #[arg(long, env = "MEETUPDB_EDITOR", global = true)]
    pub editor: Option<String>,

    /// Output raw YAML instead of a formatted rendering
    #[arg(long, global = true, conflicts_with = "json")]
    pub yaml: bool,

    /// Output raw JSON instead of a formatted rendering
    #[arg(long, global = true)]
    pub json: bool,

    /// Always use colors
    #[arg(long, global = true, conflicts_with = "no_color")]
    pub color: bool,

    /// Never use colors
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, overrides_with = "quiet")]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true, overrides_with = "verbose")]
    pub quiet: bool,

    /// Pretend the current moment is this one (YYYY-MM-DD HH:MM:SS)
    #[arg(long, env = "MEETUPDB_NOW", global = true, hide = true, value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a meetup
    Show {
        /// City, or a unique prefix of its slug
        #[arg(value_name = "CITY")]
        city: String,

        /// Date (YYYY-MM-DD, MM, ...) or relative selector (+1, p1)
        #[arg(value_name = "DATE", default_value = "")]
        date: String,
    },

    /// Edit a meetup entry
    Edit {
        #[arg(value_name = "CITY")]
        city: String,

        #[arg(value_name = "DATE", default_value = "")]
        date: String,

        /// Edit interactively (default when stdin is a terminal)
        #[arg(short = 'i', long, conflicts_with = "batch")]
        interactive: bool,

        /// Read the new entry from stdin
        #[arg(short = 'I', long = "no-interactive")]
        batch: bool,
    },

    /// Remove a meetup entry
    Rm {
        #[arg(value_name = "CITY")]
        city: String,

        #[arg(value_name = "DATE", default_value = "")]
        date: String,
    },

    /// Load the data directory and report what was stored
    Import,

    /// Write config.yaml files for cutting a meetup's video recordings
    Videometadata {
        #[arg(value_name = "CITY")]
        city: String,

        #[arg(value_name = "DATE")]
        date: String,

        /// Directory to create the per-event directory in
        #[arg(value_name = "OUTPATH", default_value = ".")]
        outpath: PathBuf,
    },
}

impl GlobalOptions {
    /// Editor argv: `--editor`, then VISUAL, then EDITOR, then vi.
    /// The command is split with shell quoting rules.
    pub fn editor_command(&self) -> Result<Vec<String>, String> {
        let command = self
            .editor
            .clone()
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        shlex::split(&command).ok_or_else(|| format!("Invalid editor command: {}", command))
    }

    /// Explicit color choice, if any.
    pub fn color_override(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

fn parse_now(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid time '{}': {}. Use YYYY-MM-DD HH:MM:SS.", s, e))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show() {
        let cli = Cli::try_parse_from(["meetupdb", "--data", "/tmp/data", "show", "brno", "p1"]).unwrap();
        assert_eq!(cli.global.data_dir, PathBuf::from("/tmp/data"));
        match cli.command {
            Commands::Show { city, date } => {
                assert_eq!(city, "brno");
                assert_eq!(date, "p1");
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_date_defaults_to_next() {
        let cli = Cli::try_parse_from(["meetupdb", "rm", "ostrava"]).unwrap();
        assert!(matches!(cli.command, Commands::Rm { date, .. } if date.is_empty()));
    }

    #[test]
    fn test_interactive_flags_conflict() {
        assert!(Cli::try_parse_from(["meetupdb", "edit", "brno", "-i", "-I"]).is_err());
    }

    #[test]
    fn test_output_format() {
        let cli = Cli::try_parse_from(["meetupdb", "show", "brno", "--yaml"]).unwrap();
        assert_eq!(cli.global.output_format(), OutputFormat::Yaml);
        assert!(Cli::try_parse_from(["meetupdb", "show", "brno", "--yaml", "--json"]).is_err());
    }

    #[test]
    fn test_parse_now() {
        let now = parse_now("2014-08-07 12:00:00").unwrap();
        assert_eq!(now.to_string(), "2014-08-07 12:00:00");
        assert!(parse_now("tomorrow").is_err());
    }

    #[test]
    fn test_explicit_editor() {
        let cli = Cli::try_parse_from(["meetupdb", "--editor", "code --wait", "import"]).unwrap();
        assert_eq!(cli.global.editor_command().unwrap(), ["code", "--wait"]);
    }

    #[test]
    fn test_editor_with_quoted_path() {
        let cli = Cli::try_parse_from(["meetupdb", "--editor", "\"/opt/My Editor/ed\" -w", "import"]).unwrap();
        assert_eq!(cli.global.editor_command().unwrap(), ["/opt/My Editor/ed", "-w"]);

        let cli = Cli::try_parse_from(["meetupdb", "--editor", "'/opt/My Editor/ed", "import"]).unwrap();
        assert!(cli.global.editor_command().is_err());
    }

    #[test]
    fn test_subcommand_prefix() {
        let cli = Cli::try_parse_from(["meetupdb", "sh", "brno"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { ref city, .. } if city == "brno"));
        let cli = Cli::try_parse_from(["meetupdb", "vid", "brno", "p1"]).unwrap();
        assert!(matches!(cli.command, Commands::Videometadata { ref outpath, .. } if outpath == &PathBuf::from(".")));
        assert!(matches!(Cli::try_parse_from(["meetupdb", "e", "brno"]).unwrap().command, Commands::Edit { .. }));
    }

    #[test]
    fn test_quiet_and_verbose_last_wins() {
        let cli = Cli::try_parse_from(["meetupdb", "-v", "-q", "import"]).unwrap();
        assert!(cli.global.quiet && !cli.global.verbose);
        let cli = Cli::try_parse_from(["meetupdb", "-q", "-v", "import"]).unwrap();
        assert!(cli.global.verbose && !cli.global.quiet);
    }
}
