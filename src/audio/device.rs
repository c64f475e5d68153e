// Output device lookup (cpal)

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Every output device the host reports, default one flagged
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let Ok(devices) = self.host.output_devices() else {
            return Vec::new();
        };

        devices
            .filter_map(|device| device.name().ok())
            .map(|name| AudioDeviceInfo {
                is_default: name == default_name,
                name,
            })
            .collect()
    }

    pub fn default_output_device(&self) -> Option<Device> {
        self.host.default_output_device()
    }

    pub fn output_device_by_name(&self, device_name: &str) -> Option<Device> {
        self.host
            .output_devices()
            .ok()?
            .find(|device| device.name().is_ok_and(|name| name == device_name))
    }

    /// Named device when given and present, host default otherwise
    pub fn resolve(&self, device_name: Option<&str>) -> Option<Device> {
        match device_name {
            Some(name) => self.output_device_by_name(name).or_else(|| {
                tracing::warn!(device = name, "output device not found, using default");
                self.default_output_device()
            }),
            None => self.default_output_device(),
        }
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
