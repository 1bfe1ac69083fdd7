//! kubectl port-forward tunnels.
//!
//! Each tunnel is an owned child process. `kill_on_drop` guarantees no
//! kubectl is left behind even if the run panics; [`PortForward::close`] is
//! the orderly path.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

const READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// An open `kubectl port-forward` tunnel to one Service.
#[derive(Debug)]
pub struct PortForward {
    service: String,
    local_port: u16,
    child: Child,
}

impl PortForward {
    /// Open a tunnel to `svc/<service>` on an ephemeral local port and wait
    /// until it accepts TCP connections.
    ///
    /// # Errors
    /// Returns an error if kubectl cannot be spawned, exits early, or the
    /// tunnel does not become connectable in time.
    pub async fn open(
        context: Option<&str>,
        namespace: &str,
        service: &str,
        remote_port: u16,
    ) -> Result<Self> {
        let local_port = pick_free_port()?;

        let mut command = Command::new("kubectl");
        command
            .arg("port-forward")
            .arg(format!("svc/{service}"))
            .arg(format!("{local_port}:{remote_port}"))
            .args(["--namespace", namespace]);
        if let Some(ctx) = context {
            command.args(["--context", ctx]);
        }

        let child = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn kubectl port-forward")?;

        debug!(service = %service, local_port, remote_port, "Opened port-forward tunnel");

        let mut forward = Self {
            service: service.to_string(),
            local_port,
            child,
        };
        forward.wait_ready().await?;
        Ok(forward)
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Local base URL for requests through this tunnel.
    #[must_use]
    pub fn local_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.local_port)
    }

    /// Poll until the local port accepts connections, bailing early if the
    /// kubectl child already exited.
    async fn wait_ready(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + READY_TIMEOUT;

        loop {
            if let Some(status) = self
                .child
                .try_wait()
                .context("Failed to poll kubectl port-forward")?
            {
                anyhow::bail!(
                    "kubectl port-forward for {} exited early ({status})",
                    self.service
                );
            }

            match TcpStream::connect(("127.0.0.1", self.local_port)).await {
                Ok(_) => return Ok(()),
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(READY_POLL_INTERVAL).await;
                }
                Err(e) => {
                    let _ = self.child.start_kill();
                    return Err(e).with_context(|| {
                        format!(
                            "port-forward for {} never became connectable on 127.0.0.1:{}",
                            self.service, self.local_port
                        )
                    });
                }
            }
        }
    }

    /// Terminate the tunnel and reap the child.
    pub async fn close(mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(service = %self.service, error = %e, "Failed to kill port-forward");
            return;
        }
        let _ = self.child.wait().await;
        debug!(service = %self.service, "Closed port-forward tunnel");
    }
}

/// Ask the OS for a free port. The listener is dropped before kubectl binds,
/// so a collision is possible but rare; the readiness poll catches it.
fn pick_free_port() -> Result<u16> {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").context("Failed to probe for a free port")?;
    let port = listener
        .local_addr()
        .context("Failed to read probe socket address")?
        .port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_ports_are_distinct_enough() {
        let a = pick_free_port().unwrap();
        let b = pick_free_port().unwrap();
        assert!(a > 0);
        assert!(b > 0);
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        // Drive the same spawn path with a binary that cannot exist.
        let result = Command::new("grill-validate-no-such-kubectl")
            .arg("port-forward")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        assert!(result.is_err());
    }
}
