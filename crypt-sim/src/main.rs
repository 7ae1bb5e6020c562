use std::process::ExitCode;

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

fn main() -> ExitCode {
    setup_log();
    dotenvy::dotenv().ok();

    // Scenario path: first argument, else CRYPT_SCENARIO
    let Some(path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CRYPT_SCENARIO").ok())
    else {
        eprintln!("usage: crypt-sim <scenario.toml>  (or set CRYPT_SCENARIO)");
        return ExitCode::from(2);
    };

    match crypt_sim::run_file(&path).and_then(|report| crypt_sim::render(&report)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(%path, error = %e, "scenario failed");
            eprintln!("crypt-sim: {e}");
            ExitCode::FAILURE
        }
    }
}
