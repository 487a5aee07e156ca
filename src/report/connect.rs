// Bounded retry for the outbound reporting connection

use std::io;
use std::net::{Ipv4Addr, TcpStream};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(200);

/// How hard to try reaching a listener that may not be up yet.
///
/// After failed attempt `n` (1-based) the connector waits `n * backoff_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub attempts: u32,
    pub backoff_step: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl ConnectPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Interrupt for the backoff sleep. Cloned handles share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        *flag.lock().unwrap_or_else(|p| p.into_inner()) = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sleep for `timeout` unless cancelled first. Returns `true` if cancelled.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|p| p.into_inner());
        let (guard, _) = signal
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|p| p.into_inner());
        *guard
    }
}

/// Run `attempt` until it succeeds, the policy is exhausted, it fails with
/// anything other than `ConnectionRefused`, or `cancel` fires during a wait.
///
/// `attempt` receives the 1-based attempt number. Giving up is not an error:
/// the caller gets `None` and carries on without a live listener.
pub fn retry_connect<T, F>(policy: &ConnectPolicy, cancel: &CancelToken, mut attempt: F) -> Option<T>
where
    F: FnMut(u32) -> io::Result<T>,
{
    for n in 1..=policy.attempts {
        if cancel.is_cancelled() {
            debug!("Connection attempts cancelled before attempt {}", n);
            return None;
        }

        match attempt(n) {
            Ok(connection) => return Some(connection),
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                debug!("Attempt {} refused: {}", n, e);
                if n < policy.attempts && cancel.sleep(policy.delay_after(n)) {
                    debug!("Connection backoff interrupted after attempt {}", n);
                    return None;
                }
            }
            Err(e) => {
                error!("Error connecting to reporting socket: {}", e);
                return None;
            }
        }
    }

    None
}

/// Connect to `port` on the loopback interface with retries.
pub fn connect_loopback(port: u16, policy: &ConnectPolicy, cancel: &CancelToken) -> Option<TcpStream> {
    let stream = retry_connect(policy, cancel, |n| {
        debug!(
            "Connecting to reporting socket on port {}, attempt number {}",
            port, n
        );
        TcpStream::connect((Ipv4Addr::LOCALHOST, port))
    });

    if stream.is_none() {
        error!("Unable to connect to reporting socket on port {}", port);
    }
    stream
}
