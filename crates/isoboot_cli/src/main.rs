//! `isoboot` command-line entry.
//!
//! # Responsibility
//! - Resolve the installation home and layout, start file logging, then run
//!   one bootstrap command.
//! - Report failures on stderr with the stage they happened in and exit
//!   non-zero.
//!
//! # Invariants
//! - File logging under the default `<home>/logs` is best effort; it never
//!   blocks a bootstrap. An explicit `--log-dir` or `--log-level` that cannot
//!   be honored is a `config` failure.

use clap::{Parser, Subcommand};
use isoboot_core::{
    default_log_level, flush_logging, init_logging, resolve_home, BootstrapError, BootstrapStage,
    Bootstrapper, LayoutConfig, LoggingError, ResolveError,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod smoke;

#[derive(Parser, Debug)]
#[command(
    name = "isoboot",
    version,
    about = "Bootstrap a long-running server from an isolated artifact set"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Installation home (defaults to ISOBOOT_HOME, then the parent of the binary's directory)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Log directory (defaults to <home>/logs)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, env = "ISOBOOT_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locate artifacts, resolve the entry point and run it until it returns
    Run,
    /// Print the located artifact entries in resolution order
    Locate,
    /// Print which tier resolves a type name
    Resolve {
        /// Dotted type name, e.g. isoboot.daemon.Server
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("isoboot: {err}");
            ExitCode::FAILURE
        }
    };
    flush_logging();
    code
}

fn execute(cli: &Cli) -> Result<(), CliError> {
    let (home, layout) = load_installation(cli)?;
    start_logging(cli, &home)?;
    dispatch(&cli.command, home, layout)
}

fn load_installation(cli: &Cli) -> Result<(PathBuf, LayoutConfig), CliError> {
    let home = resolve_home(cli.home.as_deref()).map_err(BootstrapError::from)?;
    let home = absolute(&home)?;
    let layout = LayoutConfig::load(&home).map_err(BootstrapError::from)?;
    Ok((home, layout))
}

/// Starts file logging; returns whether the file backend is active.
fn start_logging(cli: &Cli, home: &Path) -> Result<bool, CliError> {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    let (log_dir, explicit_dir) = match &cli.log_dir {
        Some(dir) => (absolute(dir)?, true),
        None => (home.join("logs"), false),
    };

    match init_logging(level, &log_dir) {
        Ok(()) => Ok(true),
        Err(err @ LoggingError::UnsupportedLevel(_)) => Err(CliError::Logging(err)),
        Err(err) if explicit_dir => Err(CliError::Logging(err)),
        Err(err) => {
            eprintln!("isoboot: warning: file logging disabled: {err}");
            Ok(false)
        }
    }
}

fn dispatch(command: &Command, home: PathBuf, layout: LayoutConfig) -> Result<(), CliError> {
    let catalog = smoke::catalog(&layout.library_suffix)
        .map_err(|err| BootstrapError::from(ResolveError::from(err)))?;
    let bootstrapper = Bootstrapper::new(home, layout, catalog);

    match command {
        Command::Run => {
            let report = bootstrapper.run()?;
            println!(
                "run_id={} entries={} entry_point_tier={}",
                report.run_id,
                report.entries,
                report.entry_point_tier.as_str()
            );
        }
        Command::Locate => {
            for entry in bootstrapper.locate()? {
                println!("{}\t{}", entry.kind().as_str(), entry.path().display());
            }
        }
        Command::Resolve { name } => {
            let (_, chain) = bootstrapper.build_chain()?;
            let resolved = chain.resolve_type(name).map_err(BootstrapError::from)?;
            match chain.isolated().origin_of(name) {
                Some(origin) => println!(
                    "{name}\t{}\t{}",
                    resolved.tier.as_str(),
                    origin.display()
                ),
                None => println!("{name}\t{}", resolved.tier.as_str()),
            }
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    std::path::absolute(path).map_err(|source| CliError::Path {
        path: path.to_path_buf(),
        source,
    })
}

/// A failed command, rendered as `stage=<stage> <message>`.
#[derive(Debug)]
enum CliError {
    Bootstrap(BootstrapError),
    Logging(LoggingError),
    Path {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CliError {
    fn stage(&self) -> BootstrapStage {
        match self {
            Self::Bootstrap(err) => err.stage(),
            Self::Logging(_) | Self::Path { .. } => BootstrapStage::Config,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage={} ", self.stage().as_str())?;
        match self {
            Self::Bootstrap(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "logging setup failed: {err}"),
            Self::Path { path, source } => {
                write!(f, "cannot make `{}` absolute: {source}", path.display())
            }
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bootstrap(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Path { source, .. } => Some(source),
        }
    }
}

impl From<BootstrapError> for CliError {
    fn from(value: BootstrapError) -> Self {
        Self::Bootstrap(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch, load_installation, start_logging, Cli, CliError};
    use clap::Parser;
    use std::ffi::OsString;
    use std::fs;
    use std::path::Path;

    fn parse(home: &Path, rest: &[&str]) -> Cli {
        let mut args = vec![
            OsString::from("isoboot"),
            OsString::from("--home"),
            home.as_os_str().to_owned(),
        ];
        args.extend(rest.iter().map(|arg| OsString::from(*arg)));
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    fn install(home: &Path, with_smoke_module: bool) {
        for root in ["extensions-private", "extensions", "bootstrap-libs"] {
            fs::create_dir_all(home.join(root)).expect("create artifact root");
        }
        if with_smoke_module {
            fs::write(home.join("extensions/isoboot-smoke-1.0.jar"), b"").expect("write jar");
        }
    }

    fn run_command(cli: &Cli) -> Result<(), CliError> {
        let (home, layout) = load_installation(cli)?;
        dispatch(&cli.command, home, layout)
    }

    #[test]
    fn smoke_install_runs_to_completion() {
        let home = tempfile::tempdir().expect("temp home");
        install(home.path(), true);

        run_command(&parse(home.path(), &["run"])).expect("smoke run should succeed");
        run_command(&parse(home.path(), &["resolve", "isoboot.daemon.Server"]))
            .expect("entry point should resolve");
    }

    #[test]
    fn missing_entry_point_reports_resolution_stage() {
        let home = tempfile::tempdir().expect("temp home");
        install(home.path(), false);

        let err = run_command(&parse(home.path(), &["run"])).expect_err("entry point is absent");
        assert!(
            err.to_string().starts_with("stage=resolution "),
            "unexpected diagnostic: {err}"
        );
    }

    #[test]
    fn missing_artifact_root_reports_discovery_stage() {
        let home = tempfile::tempdir().expect("temp home");
        install(home.path(), true);
        fs::remove_dir_all(home.path().join("bootstrap-libs")).expect("remove root");

        let err = run_command(&parse(home.path(), &["locate"])).expect_err("root is missing");
        assert!(
            err.to_string().starts_with("stage=discovery "),
            "unexpected diagnostic: {err}"
        );
    }

    #[test]
    fn default_log_dir_failure_does_not_block_bootstrap() {
        let home = tempfile::tempdir().expect("temp home");
        install(home.path(), true);
        fs::write(home.path().join("logs"), b"not a directory").expect("write stray file");

        let cli = parse(home.path(), &["locate"]);
        let file_logging = start_logging(&cli, home.path()).expect("default dir is best effort");
        assert!(!file_logging);
        run_command(&cli).expect("locate should still succeed");
    }

    #[test]
    fn explicit_log_dir_failure_is_a_config_failure() {
        let home = tempfile::tempdir().expect("temp home");
        install(home.path(), true);
        let blocked = home.path().join("blocked");
        fs::write(&blocked, b"").expect("write blocking file");
        let log_dir = blocked.join("logs");

        let cli = parse(
            home.path(),
            &["--log-dir", log_dir.to_str().expect("utf-8 temp path"), "locate"],
        );
        let err = start_logging(&cli, home.path()).expect_err("explicit dir must be honored");
        assert!(
            err.to_string().starts_with("stage=config "),
            "unexpected diagnostic: {err}"
        );
    }

    #[test]
    fn unsupported_log_level_is_a_config_failure() {
        let home = tempfile::tempdir().expect("temp home");
        install(home.path(), true);

        let cli = parse(home.path(), &["--log-level", "verbose", "locate"]);
        let err = start_logging(&cli, home.path()).expect_err("level must be rejected");
        assert!(
            err.to_string().starts_with("stage=config "),
            "unexpected diagnostic: {err}"
        );
    }
}
