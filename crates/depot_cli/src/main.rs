//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open a store (file path argument, or in-memory) through `depot_core`.
//! - Print deterministic health lines for quick local sanity checks.
//!
//! Set `DEPOT_LOG` to a level to mirror core events on stderr.

use depot_core::{LogTarget, Session, SessionOptions};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Ok(level) = std::env::var("DEPOT_LOG") {
        if let Err(err) = depot_core::init_logging(&level, LogTarget::Stderr) {
            eprintln!("logging status=error error={err}");
        }
    }

    println!("depot_core ping={}", depot_core::ping());
    println!("depot_core version={}", depot_core::core_version());

    let options = match std::env::args().nth(1) {
        Some(path) => SessionOptions::file(path),
        None => SessionOptions::memory(),
    };
    info!("event=cli_probe module=cli status=start location={:?}", options.location);

    let session = match Session::open(options) {
        Ok(session) => session,
        Err(err) => {
            println!("store status=error error_code={} error={err}", err.code());
            return ExitCode::FAILURE;
        }
    };

    match (session.validate(true), session.schema_version()) {
        (Ok(_), Ok(version)) => {
            println!("store status=ok schema_version={version}");
            ExitCode::SUCCESS
        }
        (Err(err), _) | (_, Err(err)) => {
            println!("store status=error error_code={} error={err}", err.code());
            ExitCode::FAILURE
        }
    }
}
