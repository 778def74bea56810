use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use fc_local_core::LocalError;

/// Finds a free local TCP port to publish the function's HTTP server on.
pub trait PortFinder: Send + Sync {
    fn find<'a>(
        &'a self,
        seed: u16,
    ) -> Pin<Box<dyn Future<Output = Result<u16, LocalError>> + Send + 'a>>;
}

/// Probes upward from the seed by binding a listener.
pub struct TcpPortFinder;

impl PortFinder for TcpPortFinder {
    fn find<'a>(
        &'a self,
        seed: u16,
    ) -> Pin<Box<dyn Future<Output = Result<u16, LocalError>> + Send + 'a>> {
        Box::pin(async move {
            for port in seed..=u16::MAX {
                match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
                    Ok(listener) => {
                        drop(listener);
                        return Ok(port);
                    }
                    Err(e) => tracing::trace!(port, error = %e, "Port in use"),
                }
            }
            Err(LocalError::NoFreePort(seed))
        })
    }
}

/// Always answers with the same port and records every seed it was asked for.
pub struct FixedPortFinder {
    port: u16,
    seeds: Mutex<Vec<u16>>,
}

impl FixedPortFinder {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            seeds: Mutex::new(Vec::new()),
        }
    }

    pub fn seeds(&self) -> Vec<u16> {
        self.seeds.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PortFinder for FixedPortFinder {
    fn find<'a>(
        &'a self,
        seed: u16,
    ) -> Pin<Box<dyn Future<Output = Result<u16, LocalError>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut seeds) = self.seeds.lock() {
                seeds.push(seed);
            }
            Ok(self.port)
        })
    }
}
