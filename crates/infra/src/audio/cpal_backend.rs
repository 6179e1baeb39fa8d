//! CPAL-based audio device implementation
//!
//! Provides a cross-platform interface to audio devices using the CPAL library.

use cpal::traits::{DeviceTrait, HostTrait};
use ladder_core::domain::audio::{
    AudioEnumerator, AudioError, ChannelCount, DeviceId, DeviceInfo, DeviceType, Result,
};
use tracing::{debug, info, warn};

/// Name a CPAL device, falling back to a placeholder
pub(crate) fn device_name(device: &cpal::Device) -> String {
    #[allow(deprecated)]
    device
        .name()
        .unwrap_or_else(|_| "Unknown Device".to_string())
}

/// Collect a device's capabilities into our domain type
fn describe_device(device: &cpal::Device, device_type: DeviceType) -> DeviceInfo {
    let name = device_name(device);

    let mut sample_rates = Vec::new();
    let mut channel_counts = Vec::new();

    let mut add_range = |min_rate: u32, max_rate: u32, channels: u16| {
        for rate in [min_rate, max_rate] {
            if !sample_rates.contains(&rate) {
                sample_rates.push(rate);
            }
        }
        let count = ChannelCount::from_count(channels);
        if !channel_counts.contains(&count) {
            channel_counts.push(count);
        }
    };

    if matches!(device_type, DeviceType::Input | DeviceType::Duplex) {
        if let Ok(configs) = device.supported_input_configs() {
            for config in configs {
                add_range(config.min_sample_rate(), config.max_sample_rate(), config.channels());
            }
        }
    }

    if matches!(device_type, DeviceType::Output | DeviceType::Duplex) {
        if let Ok(configs) = device.supported_output_configs() {
            for config in configs {
                add_range(config.min_sample_rate(), config.max_sample_rate(), config.channels());
            }
        }
    }

    sample_rates.sort_unstable();
    channel_counts.sort_by_key(|cc| cc.count());

    let default_config = match device_type {
        DeviceType::Output => device.default_output_config(),
        _ => device
            .default_input_config()
            .or_else(|_| device.default_output_config()),
    };
    let default_sample_rate = default_config.ok().map(|config| config.sample_rate());

    debug!("Described device: {}", name);

    DeviceInfo {
        id: DeviceId::new(name.clone()),
        name,
        device_type,
        sample_rates,
        channel_counts,
        default_sample_rate,
    }
}

/// CPAL-based audio enumerator
pub struct CpalEnumerator {
    host: cpal::Host,
}

impl Default for CpalEnumerator {
    fn default() -> Self {
        info!("Initializing CPAL enumerator");
        Self::new()
    }
}

impl CpalEnumerator {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using audio host: {:?}", host.id());
        Self { host }
    }

    pub fn host(&self) -> &cpal::Host {
        &self.host
    }

    /// Convert CPAL device capabilities to our domain type
    fn determine_device_type(device: &cpal::Device) -> Result<DeviceType> {
        let has_input = device
            .supported_input_configs()
            .map(|mut c| c.next().is_some())
            .unwrap_or(false);
        let has_output = device
            .supported_output_configs()
            .map(|mut c| c.next().is_some())
            .unwrap_or(false);

        match (has_input, has_output) {
            (true, true) => Ok(DeviceType::Duplex),
            (true, false) => Ok(DeviceType::Input),
            (false, true) => Ok(DeviceType::Output),
            (false, false) => Err(AudioError::UnsupportedConfiguration(
                "Device has no inputs or outputs".to_string(),
            )),
        }
    }

    /// Get every device the host reports
    pub fn devices(&self) -> Result<Vec<DeviceInfo>> {
        info!("Enumerating all audio devices");
        let mut devices = Vec::new();

        let cpal_devices = self
            .host
            .devices()
            .map_err(|e| AudioError::OsError(e.to_string()))?;

        for device in cpal_devices {
            match Self::determine_device_type(&device) {
                Ok(device_type) => {
                    let info = describe_device(&device, device_type);
                    debug!("Found device: {}", info.name);
                    devices.push(info);
                }
                Err(e) => {
                    warn!("Skipping device {}: {}", device_name(&device), e);
                }
            }
        }

        info!("Found {} audio devices", devices.len());
        Ok(devices)
    }

    /// Find an input device by name, or the default one
    pub fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string())),
            Some(name) => self
                .host
                .input_devices()
                .map_err(|e| AudioError::OsError(e.to_string()))?
                .find(|d| device_name(d) == name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string())),
        }
    }

    /// Find an output device by name, or the default one
    pub fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            None => self
                .host
                .default_output_device()
                .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string())),
            Some(name) => self
                .host
                .output_devices()
                .map_err(|e| AudioError::OsError(e.to_string()))?
                .find(|d| device_name(d) == name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string())),
        }
    }
}

impl AudioEnumerator for CpalEnumerator {
    fn input_devices(&self) -> Result<Vec<DeviceInfo>> {
        let all_devices = self.devices()?;
        Ok(all_devices
            .into_iter()
            .filter(|d| matches!(d.device_type, DeviceType::Input | DeviceType::Duplex))
            .collect())
    }

    fn output_devices(&self) -> Result<Vec<DeviceInfo>> {
        let all_devices = self.devices()?;
        Ok(all_devices
            .into_iter()
            .filter(|d| matches!(d.device_type, DeviceType::Output | DeviceType::Duplex))
            .collect())
    }

    fn default_input_device(&self) -> Result<DeviceInfo> {
        let device = self.find_input_device(None)?;
        Ok(describe_device(&device, DeviceType::Input))
    }

    fn default_output_device(&self) -> Result<DeviceInfo> {
        let device = self.find_output_device(None)?;
        Ok(describe_device(&device, DeviceType::Output))
    }
}
