//! Device type codes and the device option passed to feeders.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric device-type codes. These key the feeder registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum DeviceType {
    Cpu,
    Cuda,
}

impl DeviceType {
    pub const CPU_CODE: i32 = 0;
    pub const CUDA_CODE: i32 = 1;

    pub fn code(self) -> i32 {
        match self {
            DeviceType::Cpu => Self::CPU_CODE,
            DeviceType::Cuda => Self::CUDA_CODE,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::CPU_CODE => Some(DeviceType::Cpu),
            Self::CUDA_CODE => Some(DeviceType::Cuda),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Cpu => write!(f, "cpu"),
            DeviceType::Cuda => write!(f, "cuda"),
        }
    }
}

/// Where a feed should place its tensor.
///
/// `device_type` is kept as a raw code so that options naming backends this
/// build does not know about can still be carried around and rejected at
/// feeder lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct DeviceOption {
    pub device_type: i32,
    pub device_id: u32,
}

impl DeviceOption {
    pub fn new(device_type: i32, device_id: u32) -> Self {
        Self {
            device_type,
            device_id,
        }
    }

    pub fn cpu() -> Self {
        Self::new(DeviceType::CPU_CODE, 0)
    }

    pub fn cuda(device_id: u32) -> Self {
        Self::new(DeviceType::CUDA_CODE, device_id)
    }

    pub fn kind(&self) -> Option<DeviceType> {
        DeviceType::from_code(self.device_type)
    }
}

impl fmt::Display for DeviceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}:{}", kind, self.device_id),
            None => write!(f, "device_type={}:{}", self.device_type, self.device_id),
        }
    }
}
