//! Command-line argument parsing.
//!
//! Usage:
//!   ouro [OPTIONS] <FILE>
//!   ouro [OPTIONS] -c <CODE> [ARGS]...

use std::path::PathBuf;

use clap::Parser;

/// Parsed command-line arguments.
#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(name = "ouro", version, about = "Run an ouro file automation script")]
pub struct CliArgs {
    /// Run this code instead of a script file
    #[arg(short, long, value_name = "CODE")]
    pub code: Option<String>,

    /// Starting location (default: the config `location`, then the current directory)
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Config file to load instead of the default `ourorc`
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tracing filter, e.g. `ouro=debug` (overrides OURO_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,

    /// Do not omit `.git` directories and `.ouro` script files
    #[arg(short, long)]
    pub noomit: bool,

    /// Script file, or with `-c` the first script argument
    pub file: Option<PathBuf>,

    /// Arguments visible to the script as `arguments`
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Code(String),
    File(PathBuf),
}

impl CliArgs {
    /// Parse `std::env::args()`; exits with usage on error.
    pub fn from_env() -> Self {
        CliArgs::parse()
    }

    /// Split into the script source and its arguments.  `None` when there
    /// is neither `-c` nor a file.
    pub fn source(&self) -> Option<(Source, Vec<String>)> {
        match (&self.code, &self.file) {
            (Some(code), first) => {
                let mut args: Vec<String> = first.iter().map(|p| p.display().to_string()).collect();
                args.extend(self.args.iter().cloned());
                Some((Source::Code(code.clone()), args))
            }
            (None, Some(file)) => Some((Source::File(file.clone()), self.args.clone())),
            (None, None) => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("ouro").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn file_with_arguments() {
        let a = parse(&["-n", "--log", "ouro=trace", "clean.ouro", "x", "y"]);
        assert!(a.noomit);
        assert_eq!(a.log.as_deref(), Some("ouro=trace"));
        let (src, args) = a.source().unwrap();
        assert_eq!(src, Source::File(PathBuf::from("clean.ouro")));
        assert_eq!(args, ["x", "y"]);
    }

    #[test]
    fn inline_code() {
        let a = parse(&["-c", "print files", "-d", "/tmp", "one"]);
        assert_eq!(a.directory, Some(PathBuf::from("/tmp")));
        let (src, args) = a.source().unwrap();
        assert_eq!(src, Source::Code("print files".into()));
        assert_eq!(args, ["one"]);
    }

    #[test]
    fn nothing_to_run() {
        assert!(parse(&[]).source().is_none());
        assert!(CliArgs::try_parse_from(["ouro", "--bogus"]).is_err());
    }
}
