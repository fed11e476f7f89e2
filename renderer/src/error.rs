// tangent/renderer/src/error.rs
//
// Copyright © 2026 The Tangent Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The error taxonomy surfaced to the GL layer.

use tangent_gpu::{DeviceError, PlatformError};
use thiserror::Error;

/// Why `Renderer::initialize` failed. None of these are retryable without remediation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InitErrorKind {
    MissingDependency,
    IncompatiblePlatform,
    CreateDeviceInvalidArgument,
    CreateDeviceFailed,
    Other,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    #[error("initialization failed ({kind:?}): {message}")]
    Initialization { kind: InitErrorKind, message: String },
    /// A native allocation, view, or shader creation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    /// The native device was removed. Only `Renderer::reset_device` recovers from this.
    #[error("the device was lost")]
    DeviceLost,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("the renderer is not initialized")]
    NotInitialized,
}

pub type RendererError = Error;

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn init(kind: InitErrorKind, message: impl Into<String>) -> Error {
        Error::Initialization { kind, message: message.into() }
    }

    pub(crate) fn out_of_memory(message: impl Into<String>) -> Error {
        Error::OutOfMemory(message.into())
    }

    #[inline]
    pub fn is_device_lost(&self) -> bool {
        *self == Error::DeviceLost
    }
}

impl From<DeviceError> for Error {
    fn from(error: DeviceError) -> Error {
        match error {
            DeviceError::DeviceRemoved(_) => Error::DeviceLost,
            DeviceError::Unsupported(what) => Error::Unsupported(what.to_owned()),
            DeviceError::OutOfMemory | DeviceError::InvalidArgument(_) => {
                Error::OutOfMemory(error.to_string())
            }
        }
    }
}

impl From<PlatformError> for Error {
    fn from(error: PlatformError) -> Error {
        let kind = match error {
            PlatformError::MissingLibrary(_) | PlatformError::MissingEntryPoint(_) => {
                InitErrorKind::MissingDependency
            }
            PlatformError::InvalidArgument => InitErrorKind::CreateDeviceInvalidArgument,
            PlatformError::CreateDeviceFailed(_) => InitErrorKind::CreateDeviceFailed,
            PlatformError::IncompatiblePlatform(_) => InitErrorKind::IncompatiblePlatform,
        };
        Error::init(kind, error.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::{Error, InitErrorKind};
    use tangent_gpu::{DeviceError, DeviceRemovedReason, PlatformError};

    #[test]
    fn test_device_errors_keep_loss_distinct() {
        let lost: Error = DeviceError::DeviceRemoved(DeviceRemovedReason::Hung).into();
        assert!(lost.is_device_lost());
        let oom: Error = DeviceError::OutOfMemory.into();
        assert!(!oom.is_device_lost());
        match oom {
            Error::OutOfMemory(_) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_platform_error_kinds() {
        let error: Error = PlatformError::MissingEntryPoint("D3D11CreateDevice").into();
        match error {
            Error::Initialization { kind, .. } => {
                assert_eq!(kind, InitErrorKind::MissingDependency)
            }
            other => panic!("unexpected {:?}", other),
        }
        let error: Error = PlatformError::InvalidArgument.into();
        match error {
            Error::Initialization { kind, .. } => {
                assert_eq!(kind, InitErrorKind::CreateDeviceInvalidArgument)
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
