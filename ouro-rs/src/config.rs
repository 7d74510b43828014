//! `ourorc` configuration file parser.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set a setting or a script constant |
//! | Lines starting with `;` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! | Setting | Meaning |
//! |---------|---------|
//! | `log` | tracing filter directive, e.g. `ouro=debug` |
//! | `location` | starting location when `-d` is not given |
//! | `noomit` | `on` to enumerate `.git` directories and `.ouro` scripts |
//! | anything else | a string constant visible to scripts |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{Error, Result};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config { message: e.message, line: e.line }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub log: Option<String>,
    pub location: Option<String>,
    pub noomit: bool,
    /// User constants, by lowercase name.
    pub constants: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/ourorc`, when the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ouro").map(|dirs| dirs.config_dir().join("ourorc"))
    }

    /// Parse a config string.  Returns the config and the errors of
    /// recognised lines; loading never stops at a bad line.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));

            if cmd == "set" {
                let tokens = split_args(args_str.trim());
                if let Err(message) = config.parse_set(&tokens) {
                    errors.push(ConfigError { line: lineno, message });
                }
            }
        }

        (config, errors)
    }

    pub fn load_file(path: &Path) -> Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Load `path`, or the default file when it exists.  A missing default
    /// file gives the empty config.
    pub fn load(path: Option<&Path>) -> Result<(Self, Vec<ConfigError>)> {
        match path {
            Some(p) => Self::load_file(p),
            None => match Self::default_path() {
                Some(p) if p.is_file() => Self::load_file(&p),
                _ => Ok((Self::new(), Vec::new())),
            },
        }
    }

    /// `/set <name>=<value>` or `/set <name> <value>`.
    fn parse_set(&mut self, tokens: &[String]) -> std::result::Result<(), String> {
        if tokens.is_empty() {
            return Err("/set: requires an argument".into());
        }

        let (name, value) = if let Some(eq) = tokens[0].find('=') {
            let mut value = tokens[0][eq + 1..].to_owned();
            if tokens.len() > 1 {
                value.push(' ');
                value.push_str(&tokens[1..].join(" "));
            }
            (tokens[0][..eq].to_lowercase(), value)
        } else if tokens.len() >= 2 {
            (tokens[0].to_lowercase(), tokens[1..].join(" "))
        } else {
            return Err(format!("/set: missing value for '{}'", tokens[0]));
        };

        if !is_name(&name) {
            return Err(format!("/set: '{name}' is not a valid name"));
        }

        match name.as_str() {
            "log" => self.log = Some(value),
            "location" => self.location = Some(value),
            "noomit" => {
                self.noomit = match value.as_str() {
                    "on" | "1" => true,
                    "off" | "0" => false,
                    _ => return Err(format!("/set: noomit must be 'on' or 'off', not '{value}'")),
                }
            }
            _ => {
                self.constants.insert(name, value);
            }
        }
        Ok(())
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_quoted_spaces() {
        assert_eq!(split_args(r#"greeting "hello there""#), ["greeting", "hello there"]);
        assert_eq!(split_args(r#""say \"hi\"""#), [r#"say "hi""#]);
    }

    #[test]
    fn settings() {
        let (cfg, errs) = Config::load_str("/set log=ouro=debug\n/set location /tmp/work\n/set noomit on");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.log.as_deref(), Some("ouro=debug"));
        assert_eq!(cfg.location.as_deref(), Some("/tmp/work"));
        assert!(cfg.noomit);
    }

    #[test]
    fn other_names_become_constants() {
        let (cfg, errs) = Config::load_str("/set Backup=/mnt/backup\n/set greeting hello world");
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.constants.get("backup").map(String::as_str), Some("/mnt/backup"));
        assert_eq!(cfg.constants.get("greeting").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn comments_blank_lines_and_unknown_commands() {
        let src = "\
;; my ouro config\n\
\n\
/alias ls = print files\n\
/set real=yes\n";
        let (cfg, errs) = Config::load_str(src);
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(cfg.constants.len(), 1);
    }

    #[test]
    fn bad_lines_are_collected_not_fatal() {
        let (cfg, errs) = Config::load_str("/set noomit maybe\n/set lonely\n/set 9x=1\n/set ok=1");
        assert_eq!(errs.iter().map(|e| e.line).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(errs[1].message, "/set: missing value for 'lonely'");
        assert!(cfg.constants.contains_key("ok"));
        let e: Error = errs[0].clone().into();
        assert_eq!(e.exit_code(), 1);
    }

    #[test]
    fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ourorc");
        std::fs::write(&path, "/set noomit=on\n").unwrap();
        let (cfg, errs) = Config::load(Some(&path)).unwrap();
        assert!(errs.is_empty());
        assert!(cfg.noomit);
        assert!(Config::load_file(&dir.path().join("missing")).is_err());
    }
}
