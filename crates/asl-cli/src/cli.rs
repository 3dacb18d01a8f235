//! Command-line argument parsing with clap.

use std::path::PathBuf;

use asl_client::Level;
use clap::{Parser, Subcommand, ValueEnum};

/// Log to and query the system log.
#[derive(Parser, Debug, Clone)]
#[command(name = "asl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Journal file backing the log store. Without it records only live for
    /// the duration of the command.
    #[arg(long, env = "ASL_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable `key value` lines.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log a message to the console facility.
    Consolelog(ConsolelogArgs),

    /// Send a record built from key/value pairs.
    Sendlog(SendlogArgs),

    /// Search the log.
    Query(QueryArgs),
}

/// Arguments for `consolelog`.
#[derive(Parser, Debug, Clone)]
pub struct ConsolelogArgs {
    /// Sender identity; defaults to the login name.
    #[arg(short, long, env = "USER")]
    pub ident: Option<String>,

    /// Severity level name or number.
    #[arg(short, long, default_value = "notice")]
    pub level: Level,

    /// Message words, joined with single spaces.
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,
}

impl ConsolelogArgs {
    /// The message text.
    #[must_use]
    pub fn text(&self) -> String {
        self.message.join(" ")
    }
}

/// Arguments for `sendlog`.
#[derive(Parser, Debug, Clone)]
pub struct SendlogArgs {
    /// Attribute to set, as `-k KEY VALUE`. Repeatable.
    #[arg(short = 'k', long = "key", num_args = 2, value_names = ["KEY", "VALUE"])]
    pub pairs: Vec<String>,
}

impl SendlogArgs {
    /// Key/value pairs in command-line order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.chunks_exact(2).map(|kv| (kv[0].as_str(), kv[1].as_str()))
    }
}

/// Arguments for `query`.
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Only return console messages.
    #[arg(short = 'C', long)]
    pub console: bool,

    /// Match term, as `-k KEY OP VALUE`. Repeatable.
    #[arg(short = 'k', long = "key", num_args = 3, value_names = ["KEY", "OP", "VALUE"])]
    pub terms: Vec<String>,

    /// Require KEY to be present. Repeatable.
    #[arg(short = 'e', long = "exists", value_name = "KEY")]
    pub exists: Vec<String>,

    /// Render each record with FMT, substituting `{Key}` placeholders.
    #[arg(short = 'f', long = "fmt", value_name = "FMT")]
    pub fmt: Option<String>,

    /// Return newest records first.
    #[arg(long)]
    pub reverse: bool,
}

impl QueryArgs {
    /// `(key, op, value)` terms in command-line order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.terms
            .chunks_exact(3)
            .map(|t| (t[0].as_str(), t[1].as_str(), t[2].as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("asl").chain(args.iter().copied())).expect("should parse")
    }

    #[test]
    fn cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn consolelog_joins_words_and_parses_level() {
        let cli = parse(&["consolelog", "-i", "me", "-l", "error", "disk", "is", "full"]);
        let Commands::Consolelog(args) = cli.command else {
            panic!("expected consolelog");
        };
        assert_eq!(args.ident.as_deref(), Some("me"));
        assert_eq!(args.level, Level::Error);
        assert_eq!(args.text(), "disk is full");
    }

    #[test]
    fn consolelog_defaults_to_notice() {
        let cli = parse(&["consolelog", "hello"]);
        let Commands::Consolelog(args) = cli.command else {
            panic!("expected consolelog");
        };
        assert_eq!(args.level, Level::Notice);
    }

    #[test]
    fn consolelog_requires_message() {
        assert!(Cli::try_parse_from(["asl", "consolelog"]).is_err());
    }

    #[test]
    fn sendlog_collects_pairs() {
        let cli = parse(&["sendlog", "-k", "Message", "hi", "-k", "Level", "3"]);
        let Commands::Sendlog(args) = cli.command else {
            panic!("expected sendlog");
        };
        let pairs: Vec<_> = args.pairs().collect();
        assert_eq!(pairs, [("Message", "hi"), ("Level", "3")]);
    }

    #[test]
    fn query_collects_terms_and_flags() {
        let cli = parse(&[
            "--store", "/tmp/j.jsonl", "query", "-C", "-k", "Level", "<=", "3", "-e", "Session",
            "-f", "{Message}", "--reverse",
        ]);
        assert_eq!(cli.store.as_deref(), Some(std::path::Path::new("/tmp/j.jsonl")));
        let Commands::Query(args) = cli.command else {
            panic!("expected query");
        };
        assert!(args.console);
        assert!(args.reverse);
        assert_eq!(args.terms().collect::<Vec<_>>(), [("Level", "<=", "3")]);
        assert_eq!(args.exists, ["Session"]);
        assert_eq!(args.fmt.as_deref(), Some("{Message}"));
    }

    #[test]
    fn format_flag_is_global() {
        let cli = parse(&["query", "--format", "json"]);
        assert_eq!(cli.format, Format::Json);
    }
}
