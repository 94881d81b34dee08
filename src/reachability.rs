//! Network reachability probe.
//!
//! Answers "is the network usable right now?" from OS-level signals before a
//! fetch is issued. The secondary (internet-validation) signal is unreliable
//! on many platforms — frequently unknown — so only an explicit negative
//! from it may block; and if the probe itself fails, the answer is "yes" and
//! the HTTP call is left to surface the real error.

use anyhow::{Context, Result};
use std::net::UdpSocket;
use std::sync::Arc;
use tracing::warn;

/// One reading of the platform connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
  /// Primary signal: an interface is up and the OS has a route out.
  pub connected: bool,
  /// Secondary signal: whether the network validated as internet-reachable.
  /// `None` means the platform could not say.
  pub internet_reachable: Option<bool>,
}

/// Supplier of connectivity snapshots. The shipped implementation asks the
/// kernel; tests substitute fixed or failing sources.
pub trait ConnectivitySource: Send + Sync {
  fn snapshot(&self) -> Result<ConnectivitySnapshot>;
}

/// Reachability decision over any connectivity source.
#[derive(Clone)]
pub struct Reachability {
  source: Arc<dyn ConnectivitySource>,
}

impl Reachability {
  pub fn new(source: Arc<dyn ConnectivitySource>) -> Self {
    Self { source }
  }

  /// A probe backed by the OS routing layer.
  pub fn system() -> Self {
    Self::new(Arc::new(SystemConnectivity))
  }

  /// Whether an outbound call currently appears possible.
  ///
  /// An explicit `false` on either signal blocks; an unknown secondary
  /// signal does not. A failing probe fails open.
  pub fn is_reachable(&self) -> bool {
    match self.source.snapshot() {
      Ok(snapshot) => {
        if !snapshot.connected {
          return false;
        }
        snapshot.internet_reachable != Some(false)
      }
      Err(e) => {
        warn!(err = %e, "connectivity probe failed, assuming reachable");
        true
      }
    }
  }
}

/// Asks the kernel whether it has a route to a public address. `connect` on
/// a UDP socket sends no packets; it only resolves the local route, so this
/// is cheap and generates no traffic. The validation signal is left unknown.
pub struct SystemConnectivity;

impl ConnectivitySource for SystemConnectivity {
  fn snapshot(&self) -> Result<ConnectivitySnapshot> {
    let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind connectivity probe socket")?;
    let connected = socket.connect("8.8.8.8:53").is_ok();
    Ok(ConnectivitySnapshot { connected, internet_reachable: None })
  }
}
