//! Shared utilities for integration testing.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use svcboot::cli::{Cli, ExecuteError};
use svcboot::lifecycle::{Phase, Shutdown};

/// A service bootstrapped on a fixed loopback port.
pub struct TestService {
    pub shutdown: Shutdown,
    pub phases: watch::Receiver<Phase>,
    pub handle: JoinHandle<Result<(), ExecuteError>>,
    pub base_url: String,
}

impl TestService {
    /// Trigger graceful shutdown and wait for a clean exit.
    pub async fn stop(mut self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("service did not stop in time")
            .expect("service task panicked");
        result.expect("service exited with an error");
        wait_for_phase(&mut self.phases, Phase::Stopped).await;
    }
}

/// Spawn the service with `--serverAddress=<addr>` plus any extra flags and
/// wait until it reports running. `addr` must be of the `:port` form so the
/// base URL can point at loopback.
pub async fn spawn_service(addr: &str, extra: &[&str]) -> TestService {
    let cli = Cli::new();
    let shutdown = cli.shutdown();
    let mut phases = cli.phases();

    let mut argv: Vec<String> = vec![
        svcboot::PROGRAM.to_string(),
        format!("--serverAddress={}", addr),
    ];
    argv.extend(extra.iter().map(|flag| flag.to_string()));

    let handle = tokio::spawn(async move { cli.execute(argv).await });
    wait_for_phase(&mut phases, Phase::Running).await;

    TestService {
        shutdown,
        phases,
        handle,
        base_url: format!("http://127.0.0.1{}", addr),
    }
}

/// Wait until the phase channel reports `want`.
pub async fn wait_for_phase(phases: &mut watch::Receiver<Phase>, want: Phase) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *phases.borrow_and_update() == want {
                return;
            }
            if phases.changed().await.is_err() {
                panic!("Phase channel closed before reaching {}", want);
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Timed out waiting for phase {}", want));
}

/// A client that ignores any proxy configured in the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build HTTP client")
}
