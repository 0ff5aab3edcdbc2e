//! Command-line configuration (`spec.md` §6: `ethersrv [-f] [-v] [-h]
//! <interface> <path>...`), parsed with `clap`'s derive API.

use std::path::PathBuf;

use clap::Parser;

use crate::drives::DriveTable;

/// `ethersrv [-f] [-v] [-h] <interface> <path> [<path>...]`
#[derive(Parser, Debug)]
#[command(name = "ethersrv", about = "EtherDFS file server")]
pub struct Cli {
    /// Stay in the foreground instead of daemonizing.
    #[arg(short = 'f', long = "foreground")]
    pub foreground: bool,

    /// Enable debug tracing to standard error.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Network interface to bind the raw socket to.
    pub interface: String,

    /// Host directories to expose, assigned to C:, D:, ... in order given.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Fully resolved server configuration, built from [`Cli`] after path
/// validation (`spec.md` §6: trailing `/` on a path is a user error).
#[derive(Debug)]
pub struct Config {
    pub interface: String,
    pub foreground: bool,
    pub verbose: bool,
    pub drives: DriveTable,
}

impl Config {
    /// Validates and resolves a parsed [`Cli`] into a [`Config`]. Rejects
    /// any path ending in `/` before it ever reaches [`DriveTable::build`]
    /// (`spec.md` §6).
    pub fn from_cli(cli: Cli) -> Result<Config, String> {
        for path in &cli.paths {
            if has_trailing_slash(path) {
                return Err(format!(
                    "path {} has a trailing '/', which is rejected",
                    path.display()
                ));
            }
        }
        let drives = DriveTable::build(&cli.paths).map_err(|e| e.to_string())?;
        Ok(Config {
            interface: cli.interface,
            foreground: cli.foreground,
            verbose: cli.verbose,
            drives,
        })
    }
}

fn has_trailing_slash(path: &std::path::Path) -> bool {
    path.as_os_str()
        .to_str()
        .map(|s| s.len() > 1 && s.ends_with('/'))
        .unwrap_or(false)
}
