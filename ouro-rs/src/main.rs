use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::CommandFactory;
use tracing::{debug, warn};

use ouro::cli::{CliArgs, Source};
use ouro::config::Config;
use ouro::env::Env;
use ouro::error::Result;
use ouro::logging;
use ouro::script::{Context, Script, Value};

fn main() -> ExitCode {
    let args = CliArgs::from_env();

    let (config, config_errors) = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ouro: cannot read config: {e}");
            return exit(e.exit_code());
        }
    };

    logging::init(args.log.as_deref(), config.log.as_deref());
    for e in &config_errors {
        warn!(line = e.line, "config: {}", e.message);
    }

    match run(&args, &config) {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("ouro: {e}");
            exit(e.exit_code())
        }
    }
}

fn run(args: &CliArgs, config: &Config) -> Result<i32> {
    let Some((source, arguments)) = args.source() else {
        let _ = CliArgs::command().print_help();
        return Ok(2);
    };
    let code = match source {
        Source::Code(code) => code,
        Source::File(path) => std::fs::read_to_string(path)?,
    };

    let location = start_location(args.directory.as_deref(), config.location.as_deref())?;
    debug!(location = %location, "starting location");

    let mut ctx = Context::new(&location, arguments);
    for (name, value) in &config.constants {
        ctx.add_global(name, Value::Str(value.clone()));
    }
    let env = Env::system().with_noomit(args.noomit || config.noomit);

    Script::parse(&code, ctx, env)?.run()
}

/// `-d`, then the config `location`, then the current directory.  Relative
/// paths are taken from the current directory.
fn start_location(flag: Option<&Path>, config: Option<&str>) -> Result<String> {
    let cwd = std::env::current_dir()?;
    let dir = match flag.map(Path::to_path_buf).or_else(|| config.map(PathBuf::from)) {
        Some(d) if d.is_absolute() => d,
        Some(d) => cwd.join(d),
        None => cwd,
    };
    Ok(dir.display().to_string())
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}
