//! Attach/detach monitoring by polling device presence
//!
//! Removal faults the session so the receive loop stops re-arming even when
//! the platform's read error is not recognized as fatal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::discovery::DeviceDiscovery;
use crate::session::SessionShared;
use crate::types::SessionEvent;

/// Spawn the presence monitor for one session generation
pub(crate) fn spawn_presence_monitor(
    shared: Arc<SessionShared>,
    discovery: Arc<dyn DeviceDiscovery>,
    generation: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_millis(shared.config.monitor_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the device was just opened
        interval.tick().await;

        let descriptor = shared.descriptor.clone();
        let mut present = true;

        loop {
            interval.tick().await;
            if shared.generation() != generation {
                break;
            }

            let now = match discovery.is_present(&descriptor).await {
                Ok(now) => now,
                Err(e) => {
                    debug!("Presence check for {} failed: {}", descriptor.path, e);
                    continue;
                }
            };
            if now == present || shared.generation() != generation {
                continue;
            }
            present = now;

            let (verb, event) = if now {
                ("Inserted", SessionEvent::Inserted)
            } else {
                ("Removed", SessionEvent::Removed)
            };
            info!("{} {}", verb, descriptor.identity());
            shared.sink.neutral(format!(
                "{} Hid Device --> VID {:04X}, PID {:04X}",
                verb, descriptor.vendor_id, descriptor.product_id
            ));
            shared.publish(event);

            // Handles of a removed device never recover; a re-insert is
            // only announced and needs a fresh connect
            if !now {
                shared.fault(generation, format!("Device removed: {}", descriptor.path));
            }
        }

        debug!("Presence monitor for {} exiting", descriptor.path);
    })
}
