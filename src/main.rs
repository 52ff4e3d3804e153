mod app;
mod cli;

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = cli::parse();

    let default_level = if cli.verbose { "gpuconv=info" } else { "gpuconv=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    app::run(cli);
}
