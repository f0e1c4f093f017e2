//! In-Process Health Probe
//!
//! Every service binary accepts a single `--healthcheck` flag: probe the
//! service's own `/health` endpoint and exit 0/1. Used as the container
//! health command so orchestrators need no extra tooling.

use std::time::Duration;

/// True when the process was invoked with `--healthcheck`.
pub fn requested() -> bool {
    std::env::args().any(|a| a == "--healthcheck")
}

/// Probe `GET /health` on the given bind address.
///
/// Wildcard binds are probed over loopback.
pub async fn probe(bind_address: &str) -> bool {
    let target = bind_address
        .replace("0.0.0.0", "127.0.0.1")
        .replace("[::]", "[::1]");
    let url = format!("http://{target}/health");

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Run the probe and exit with the conventional status code.
pub async fn run(bind_address: &str) -> ! {
    let healthy = probe(bind_address).await;
    std::process::exit(i32::from(!healthy));
}
