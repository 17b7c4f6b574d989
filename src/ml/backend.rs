// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<Wgpu> unless the CPU backend is
// asked for. Evaluation and inference use the inner backend
// of whichever was chosen.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    Autodiff, NdArray, Wgpu,
};

pub type WgpuTrain    = Autodiff<Wgpu>;
pub type NdArrayTrain = Autodiff<NdArray>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Wgpu,
    NdArray,
}

impl BackendKind {
    pub fn wgpu_device() -> WgpuDevice {
        WgpuDevice::default()
    }

    pub fn ndarray_device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Wgpu    => write!(f, "wgpu"),
            BackendKind::NdArray => write!(f, "ndarray"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wgpu" | "gpu"       => Ok(BackendKind::Wgpu),
            "ndarray" | "cpu"    => Ok(BackendKind::NdArray),
            other => Err(format!("unknown backend '{other}' (expected 'wgpu' or 'ndarray')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_names() {
        assert_eq!("wgpu".parse::<BackendKind>(), Ok(BackendKind::Wgpu));
        assert_eq!("CPU".parse::<BackendKind>(), Ok(BackendKind::NdArray));
        assert!("cuda".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&BackendKind::NdArray).unwrap();
        assert_eq!(json, "\"ndarray\"");
        assert_eq!(BackendKind::NdArray.to_string(), "ndarray");
    }
}
