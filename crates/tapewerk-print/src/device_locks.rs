// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-device session exclusivity.
//
// A device handles one job at a time. Sessions are keyed by resolved device
// address so jobs for different printers never wait on each other, and a
// second job for a busy printer is turned away at once rather than queued.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Registry of devices with a session in flight.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct DeviceLocks {
    active: Arc<Mutex<HashSet<SocketAddr>>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `device` without waiting. `None` if a session already holds it.
    pub fn try_acquire(&self, device: SocketAddr) -> Option<DeviceGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(device) {
            debug!(device = %device, "device already has a session");
            return None;
        }
        debug!(device = %device, "device claimed");
        Some(DeviceGuard {
            device,
            active: Arc::clone(&self.active),
        })
    }

    /// Whether a session currently holds `device`.
    pub fn is_active(&self, device: SocketAddr) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&device)
    }

    /// Number of devices with a session in flight.
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive claim on one device; released on drop.
#[derive(Debug)]
pub struct DeviceGuard {
    device: SocketAddr,
    active: Arc<Mutex<HashSet<SocketAddr>>>,
}

impl DeviceGuard {
    pub fn device(&self) -> SocketAddr {
        self.device
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.device);
        debug!(device = %self.device, "device released");
    }
}
