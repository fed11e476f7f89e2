// tangent/soft/src/platform.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::SoftDevice;
use tangent_gpu::desc::AdapterDesc;
use tangent_gpu::{CreateDeviceFlags, DriverType, FeatureLevel, Platform, PlatformError};

/// What the simulated machine provides.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub libraries_present: bool,
    pub entry_point_present: bool,
    pub debug_layer_available: bool,
    pub max_feature_level: FeatureLevel,
    /// Makes device creation reject its arguments.
    pub reject_arguments: bool,
    pub presentation_supported: bool,
    /// `None` makes adapter queries fail.
    pub adapter: Option<AdapterDesc>,
    pub constant_buffer_offsets: bool,
}

impl Default for PlatformConfig {
    fn default() -> PlatformConfig {
        PlatformConfig {
            libraries_present: true,
            entry_point_present: true,
            debug_layer_available: true,
            max_feature_level: FeatureLevel::Level11_0,
            reject_arguments: false,
            presentation_supported: true,
            adapter: Some(AdapterDesc {
                description: "Tangent Soft Rasterizer".to_owned(),
                vendor_id: 0x1414,
                device_id: 0x008c,
                sub_sys_id: 0,
                revision: 0,
            }),
            constant_buffer_offsets: true,
        }
    }
}

/// A device creation attempt and its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceCreation {
    pub driver_type: DriverType,
    pub flags: CreateDeviceFlags,
    pub feature_level: Option<FeatureLevel>,
}

pub struct SoftPlatform {
    config: PlatformConfig,
    libraries_loaded: bool,
    creations: Vec<DeviceCreation>,
}

impl SoftPlatform {
    pub fn new(config: PlatformConfig) -> SoftPlatform {
        SoftPlatform { config, libraries_loaded: false, creations: vec![] }
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut PlatformConfig {
        &mut self.config
    }

    #[inline]
    pub fn libraries_loaded(&self) -> bool {
        self.libraries_loaded
    }

    #[inline]
    pub fn creations(&self) -> &[DeviceCreation] {
        &self.creations
    }
}

impl Default for SoftPlatform {
    fn default() -> SoftPlatform {
        SoftPlatform::new(PlatformConfig::default())
    }
}

impl Platform for SoftPlatform {
    type Device = SoftDevice;

    fn load_libraries(&mut self) -> Result<(), PlatformError> {
        if !self.config.libraries_present {
            return Err(PlatformError::MissingLibrary("d3d11.dll".to_owned()));
        }
        if !self.config.entry_point_present {
            return Err(PlatformError::MissingEntryPoint("D3D11CreateDevice"));
        }
        self.libraries_loaded = true;
        Ok(())
    }

    fn unload_libraries(&mut self) {
        self.libraries_loaded = false;
    }

    fn create_device(&mut self,
                     driver_type: DriverType,
                     flags: CreateDeviceFlags,
                     feature_levels: &[FeatureLevel])
                     -> Result<SoftDevice, PlatformError> {
        let max_level = self.config.max_feature_level;
        let feature_level = feature_levels.iter().cloned().find(|&level| level <= max_level);
        self.creations.push(DeviceCreation { driver_type, flags, feature_level });

        if !self.libraries_loaded {
            return Err(PlatformError::MissingLibrary("d3d11.dll".to_owned()));
        }
        if self.config.reject_arguments || feature_levels.is_empty() {
            return Err(PlatformError::InvalidArgument);
        }
        if flags.contains(CreateDeviceFlags::DEBUG) && !self.config.debug_layer_available {
            return Err(PlatformError::CreateDeviceFailed("debug layer is not installed"
                                                         .to_owned()));
        }
        let feature_level = match feature_level {
            Some(feature_level) => feature_level,
            None => {
                return Err(PlatformError::CreateDeviceFailed(
                    format!("adapter supports at most {:?}", max_level)))
            }
        };

        debug!("creating {:?} device at {:?}", driver_type, feature_level);
        Ok(SoftDevice::new(feature_level,
                           driver_type,
                           flags.contains(CreateDeviceFlags::DEBUG),
                           self.config.adapter.clone(),
                           self.config.constant_buffer_offsets))
    }

    fn check_presentation_support(&self, _: &SoftDevice) -> Result<(), PlatformError> {
        if self.config.presentation_supported {
            Ok(())
        } else {
            Err(PlatformError::IncompatiblePlatform("presentation requires DXGI 1.2".to_owned()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::{PlatformConfig, SoftPlatform};
    use tangent_gpu::{CreateDeviceFlags, Device, DriverType, FeatureLevel, Platform};
    use tangent_gpu::PlatformError;

    #[test]
    fn test_picks_first_supported_level() {
        let mut platform = SoftPlatform::new(PlatformConfig {
            max_feature_level: FeatureLevel::Level10_1,
            ..PlatformConfig::default()
        });
        platform.load_libraries().unwrap();
        let levels = [FeatureLevel::Level11_0, FeatureLevel::Level10_1, FeatureLevel::Level10_0];
        let device = platform.create_device(DriverType::Hardware,
                                            CreateDeviceFlags::empty(),
                                            &levels).unwrap();
        assert_eq!(device.feature_level(), FeatureLevel::Level10_1);
    }

    #[test]
    fn test_missing_debug_layer() {
        let mut platform = SoftPlatform::new(PlatformConfig {
            debug_layer_available: false,
            ..PlatformConfig::default()
        });
        platform.load_libraries().unwrap();
        let result = platform.create_device(DriverType::Hardware,
                                            CreateDeviceFlags::DEBUG,
                                            &[FeatureLevel::Level11_0]);
        match result {
            Err(PlatformError::CreateDeviceFailed(_)) => {}
            _ => panic!("expected the debug device to fail"),
        }
        assert_eq!(platform.creations().len(), 1);
    }
}
