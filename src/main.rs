use std::process::ExitCode;

use strata::StrataConfig;

fn main() -> ExitCode {
    let _ = env_logger::try_init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => match StrataConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("could not load {}: {e}", path.to_string_lossy());
                return ExitCode::FAILURE;
            }
        },
        None => StrataConfig::load_or_default(),
    };

    match strata::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
