//! Bounded per-kind device registry.
//!
//! A [`DeviceRegistry`] owns the live sessions of one device kind and the collaborator that
//! finds them. It is bounded by the kind's [`Device::MAX_DEVICES`] (optionally lowered by
//! configuration).
//!
//! # Lifecycle
//! - [`discover`](DeviceRegistry::discover) replaces the set with whatever the collaborator
//!   finds now, in discovery order, skipping devices that are already disconnected.
//! - [`update`](DeviceRegistry::update) polls every device once; devices observed
//!   disconnected are retired and removed.
//! - An empty set is rediscovered lazily by [`default_device`](DeviceRegistry::default_device)
//!   and [`all_or_discover`](DeviceRegistry::all_or_discover).

use crate::config::Config;
use crate::device::Device;
use crate::error::{InputError, Result};
use crate::keyboard::Keyboard;
use crate::metadata::DeviceKind;
use crate::mouse::Mouse;
use crate::raw::RawInputPlatform;
use crate::xinput::{Controller, Slot, XInput};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Finds devices of kind `D`.
pub trait Discover<D> {
    /// Open up to `limit` connected devices, in discovery order.
    fn discover(&self, limit: usize) -> Result<Vec<D>>;
}

impl<P: RawInputPlatform> Discover<Keyboard> for P {
    fn discover(&self, limit: usize) -> Result<Vec<Keyboard>> {
        let mut found = Vec::new();
        for desc in self.enumerate()? {
            if found.len() >= limit {
                break;
            }
            if desc.kind != DeviceKind::Keyboard {
                continue;
            }
            let mut keyboard = Keyboard::open(self, found.len(), desc)?;
            keyboard.update()?;
            if keyboard.is_connected() {
                found.push(keyboard);
            }
        }
        Ok(found)
    }
}

impl<P: RawInputPlatform> Discover<Mouse> for P {
    fn discover(&self, limit: usize) -> Result<Vec<Mouse>> {
        let mut found = Vec::new();
        for desc in self.enumerate()? {
            if found.len() >= limit {
                break;
            }
            if desc.kind != DeviceKind::Mouse {
                continue;
            }
            let mut mouse = Mouse::open(self, found.len(), desc)?;
            mouse.update()?;
            if mouse.is_connected() {
                found.push(mouse);
            }
        }
        Ok(found)
    }
}

/// Controllers are found by polling the four slots.
impl Discover<Controller> for Arc<XInput> {
    fn discover(&self, limit: usize) -> Result<Vec<Controller>> {
        let mut found = Vec::new();
        for slot in Slot::ALL {
            if found.len() >= limit {
                break;
            }
            let mut pad = Controller::new(Arc::clone(self), slot);
            pad.update(Duration::ZERO)?;
            if pad.is_connected() {
                found.push(pad);
            }
        }
        Ok(found)
    }
}

pub struct DeviceRegistry<D, P> {
    devices: Vec<D>,
    platform: P,
    capacity: usize,
}

impl<D, P> DeviceRegistry<D, P>
where
    D: Device,
    P: Discover<D>,
{
    /// Empty registry capped at `D::MAX_DEVICES`. Nothing is discovered yet.
    pub fn new(platform: P) -> Self {
        Self::with_capacity(platform, D::MAX_DEVICES)
    }

    /// Registry capped by the `[registry]` section of `config`.
    pub fn from_config(platform: P, config: &Config) -> Self {
        let capacity = config.registry.limit(D::KIND).unwrap_or(D::MAX_DEVICES);
        Self::with_capacity(platform, capacity)
    }

    /// Cap lowered to `capacity` (never raised above `D::MAX_DEVICES`).
    pub fn with_capacity(platform: P, capacity: usize) -> Self {
        Self {
            devices: Vec::new(),
            platform,
            capacity: capacity.min(D::MAX_DEVICES),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Replace the current set with a fresh enumeration.
    pub fn discover(&mut self) -> Result<()> {
        for mut old in self.devices.drain(..) {
            old.retire();
        }
        self.devices = self.platform.discover(self.capacity)?;
        info!(count = self.devices.len(), capacity = self.capacity, "discovered devices");
        for d in &self.devices {
            debug!(device = %d.describe(), "registered");
        }
        Ok(())
    }

    #[inline]
    pub fn all(&self) -> &[D] {
        &self.devices
    }

    #[inline]
    pub fn all_mut(&mut self) -> &mut [D] {
        &mut self.devices
    }

    /// All devices, rediscovering first when the set is empty.
    pub fn all_or_discover(&mut self) -> Result<&[D]> {
        if self.devices.is_empty() {
            self.discover()?;
        }
        Ok(&self.devices)
    }

    /// First device, rediscovering first when the set is empty.
    pub fn default_device(&mut self) -> Result<Option<&mut D>> {
        if self.devices.is_empty() {
            self.discover()?;
        }
        Ok(self.devices.first_mut())
    }

    pub fn get(&self, id: &str) -> Option<&D> {
        self.devices.iter().find(|d| d.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut D> {
        self.devices.iter_mut().find(|d| d.id() == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Poll every device once, then drop the ones that reported disconnected.
    ///
    /// Every device is polled even when an earlier one fails; the first failure is returned.
    pub fn update(&mut self, time: Duration) -> Result<()> {
        let mut first_err: Option<InputError> = None;
        for d in &mut self.devices {
            if let Err(e) = d.update(time) {
                warn!(device = %d.describe(), error = %e, "device update failed");
                first_err.get_or_insert(e);
            }
        }

        self.devices.retain_mut(|d| {
            if d.is_connected() {
                return true;
            }
            info!(device = %d.describe(), "device removed");
            d.retire();
            false
        });

        first_err.map_or(Ok(()), Err)
    }

    /// Remove the device with `id`. Returns whether one was removed.
    pub fn notify_disconnected(&mut self, id: &str) -> bool {
        let Some(pos) = self.devices.iter().position(|d| d.id() == id) else {
            return false;
        };
        let mut d = self.devices.remove(pos);
        info!(device = %d.describe(), "device disconnected");
        d.retire();
        true
    }
}
