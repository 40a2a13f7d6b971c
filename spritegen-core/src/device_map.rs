use std::fmt;

use candle_core::utils::{cuda_is_available, metal_is_available};

/// Which device the caller asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceMap {
    ForceCpu,
    Ordinal(usize),
}

impl Default for DeviceMap {
    fn default() -> Self {
        Self::Ordinal(0)
    }
}

/// The device actually picked after checking for accelerators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceChoice {
    Cuda(usize),
    Metal(usize),
    Cpu,
}

impl DeviceChoice {
    /// Prefers CUDA, then Metal, and falls back to the CPU.
    pub fn detect(device_map: DeviceMap) -> Self {
        Self::detect_with(device_map, cuda_is_available(), metal_is_available())
    }

    fn detect_with(device_map: DeviceMap, cuda: bool, metal: bool) -> Self {
        match device_map {
            DeviceMap::ForceCpu => Self::Cpu,
            DeviceMap::Ordinal(ordinal) if cuda => Self::Cuda(ordinal),
            DeviceMap::Ordinal(ordinal) if metal => Self::Metal(ordinal),
            DeviceMap::Ordinal(_) => Self::Cpu,
        }
    }

    pub fn is_accelerated(&self) -> bool {
        !matches!(self, Self::Cpu)
    }
}

impl fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            Self::Metal(ordinal) => write!(f, "metal:{ordinal}"),
            Self::Cpu => f.write_str("cpu"),
        }
    }
}
