use std::process::ExitCode;

use clap::Parser;
use lib_core::AppResult;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;
mod report;

use app::{App, CompareArgs};
use cli::{Cli, Command};

fn init_tracing(json: bool) {
    let filter = EnvFilter::builder().with_default_directive(Level::INFO.into()).from_env_lossy();

    // stdout carries the report, logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true).with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr)))
        .init();
}

async fn run(cli: Cli) -> AppResult<ExitCode> {
    match cli.command {
        Command::Compare {
            baseline,
            current,
            download,
            out,
            preview,
        } => {
            let app = App::new(cli.service_url, cli.format)?;
            app.compare(CompareArgs {
                baseline,
                current,
                download,
                out,
                preview,
            })
            .await
        }
        Command::Health => App::new(cli.service_url, cli.format)?.health().await,
        Command::Limits => {
            report::limits(cli.format);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    // load env
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to build async rt: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(err) => {
            err.trace();
            eprintln!("{} // [{}] - {}", err.message(), err.at(), err.err_message());
            ExitCode::FAILURE
        }
    }
}
