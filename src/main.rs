use std::process::ExitCode;

use clap::Parser;

use etherdfs_server::config::{Cli, Config};
use etherdfs_server::lockfile::{self, LockFile};
use etherdfs_server::net::RawSocket;
use etherdfs_server::{server, signal};

fn main() -> ExitCode {
    // `get_matches`/`try_parse` instead of `Cli::parse()` so a bad usage
    // exits 1 (spec.md §6), not clap's own default of 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.exit_code() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            };
        }
    };
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match Config::from_cli(cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ethersrv: {e}");
            return ExitCode::from(1);
        }
    };

    let _lock = match LockFile::acquire(lockfile::default_path()) {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("ethersrv: cannot acquire lock file: {e}");
            return ExitCode::from(1);
        }
    };

    let socket = match RawSocket::open(&config.interface) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ethersrv: cannot open interface {}: {e}", config.interface);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = signal::install() {
        eprintln!("ethersrv: cannot install signal handlers: {e}");
        return ExitCode::from(1);
    }

    // Daemonization itself is out of scope here (spec.md §1); `-f` only
    // distinguishes "stay attached" from what an external wrapper does.
    let _ = config.foreground;

    server::run(&socket, &config.drives);

    // `_lock` drops here, unlinking the lock file on this and every other
    // clean exit path (spec.md §5, §6).
    ExitCode::SUCCESS
}
