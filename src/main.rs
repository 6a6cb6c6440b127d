// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, create a client and hand it to
//   the UI loop.
// - Returns `anyhow::Result` to simplify error handling at the top level.

use actu_admin_cli::{client::DirectoryClient, ui};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the menu. Quiet by
    // default; RUST_LOG=debug traces every request.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Base URL comes from `ACTU_SERVICE_URL` or defaults to the local
    // service address. See `client::DirectoryClient::from_env`.
    let client = DirectoryClient::from_env()?;

    // Start the interactive session. This call blocks until the operator
    // quits (or fails the login / role gate).
    ui::run(client)?;
    Ok(())
}
