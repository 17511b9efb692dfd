use std::process::ExitCode;

use netsim::{dispatch, logging, Config};

fn main() -> ExitCode {
    logging::init();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let code = dispatch::run(std::env::args_os(), &config);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
