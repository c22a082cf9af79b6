// 该文件是 Kanzuo （看座） 项目的一部分。
// src/session/config.rs - 会话初始化配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::ffi::CString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ffi;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取配置文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("解析配置文件失败: {0}")]
  Json(#[from] serde_json::Error),
  #[error("路径包含 NUL 字符: {0}")]
  InvalidPath(PathBuf),
  #[error("无效的计算模式: {0}")]
  InvalidComputationMode(String),
}

/// 推理使用的计算设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputationMode {
  #[default]
  Cpu,
  Gpu,
  Tpu,
}

impl ComputationMode {
  pub fn as_raw(self) -> ffi::ERComputationMode {
    match self {
      ComputationMode::Cpu => ffi::ER_COMPUTATION_MODE_CPU,
      ComputationMode::Gpu => ffi::ER_COMPUTATION_MODE_GPU,
      ComputationMode::Tpu => ffi::ER_COMPUTATION_MODE_TPU,
    }
  }
}

impl TryFrom<i32> for ComputationMode {
  type Error = ConfigError;

  fn try_from(value: i32) -> Result<Self, Self::Error> {
    match u32::try_from(value) {
      Ok(ffi::ER_COMPUTATION_MODE_CPU) => Ok(ComputationMode::Cpu),
      Ok(ffi::ER_COMPUTATION_MODE_GPU) => Ok(ComputationMode::Gpu),
      Ok(ffi::ER_COMPUTATION_MODE_TPU) => Ok(ComputationMode::Tpu),
      _ => Err(ConfigError::InvalidComputationMode(value.to_string())),
    }
  }
}

impl FromStr for ComputationMode {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "cpu" => Ok(ComputationMode::Cpu),
      "gpu" => Ok(ComputationMode::Gpu),
      "tpu" => Ok(ComputationMode::Tpu),
      other => other
        .parse::<i32>()
        .map_err(|_| ConfigError::InvalidComputationMode(s.to_string()))
        .and_then(ComputationMode::try_from),
    }
  }
}

impl fmt::Display for ComputationMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ComputationMode::Cpu => "cpu",
      ComputationMode::Gpu => "gpu",
      ComputationMode::Tpu => "tpu",
    };
    f.write_str(name)
  }
}

/// `saInit` 的结构化配置。
///
/// 路径为 `None` 时使用配置文件中的设置。外部推理回调不受支持，始终为空。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  pub det_sdk_directory: Option<PathBuf>,
  pub det_config_directory: Option<PathBuf>,
  pub det_config_file: Option<PathBuf>,
  pub scl_model_directory: Option<PathBuf>,
  pub scl_model_filename: Option<PathBuf>,
  pub scl_model_p_table_filename: Option<PathBuf>,
  pub computation_mode: ComputationMode,
  /// 仅在 GPU 模式下使用
  pub gpu_device_id: i32,
  pub num_threads: i32,
}

impl SessionConfig {
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    debug!("读取会话配置: {}", path.display());
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  pub fn det_sdk_directory(mut self, path: impl Into<PathBuf>) -> Self {
    self.det_sdk_directory = Some(path.into());
    self
  }

  pub fn det_config_directory(mut self, path: impl Into<PathBuf>) -> Self {
    self.det_config_directory = Some(path.into());
    self
  }

  pub fn det_config_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.det_config_file = Some(path.into());
    self
  }

  pub fn scl_model_directory(mut self, path: impl Into<PathBuf>) -> Self {
    self.scl_model_directory = Some(path.into());
    self
  }

  pub fn scl_model_filename(mut self, path: impl Into<PathBuf>) -> Self {
    self.scl_model_filename = Some(path.into());
    self
  }

  pub fn scl_model_p_table_filename(mut self, path: impl Into<PathBuf>) -> Self {
    self.scl_model_p_table_filename = Some(path.into());
    self
  }

  pub fn computation_mode(mut self, mode: ComputationMode) -> Self {
    self.computation_mode = mode;
    self
  }

  pub fn gpu_device_id(mut self, id: i32) -> Self {
    self.gpu_device_id = id;
    self
  }

  pub fn num_threads(mut self, threads: i32) -> Self {
    self.num_threads = threads;
    self
  }

  pub fn marshal(&self) -> Result<MarshalledConfig, ConfigError> {
    MarshalledConfig::new(self)
  }
}

pub(crate) fn path_to_cstring(path: &Path) -> Result<CString, ConfigError> {
  CString::new(path.as_os_str().as_encoded_bytes())
    .map_err(|_| ConfigError::InvalidPath(path.to_path_buf()))
}

/// 转换为 C 结构体的配置，持有全部路径字符串直到自身被释放
pub struct MarshalledConfig {
  raw: ffi::SaConfig,
  _strings: Vec<CString>,
}

impl MarshalledConfig {
  pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
    let mut strings = Vec::new();
    let mut marshal = |path: &Option<PathBuf>| -> Result<*const std::os::raw::c_char, ConfigError> {
      match path {
        Some(path) => {
          let s = path_to_cstring(path)?;
          // CString 的堆内存不会随 Vec 扩容而移动
          let p = s.as_ptr();
          strings.push(s);
          Ok(p)
        }
        None => Ok(ptr::null()),
      }
    };

    let raw = ffi::SaConfig {
      det_sdk_directory: marshal(&config.det_sdk_directory)?,
      det_config_directory: marshal(&config.det_config_directory)?,
      det_config_file: marshal(&config.det_config_file)?,
      scl_model_directory: marshal(&config.scl_model_directory)?,
      scl_model_filename: marshal(&config.scl_model_filename)?,
      scl_model_p_table_filename: marshal(&config.scl_model_p_table_filename)?,
      computation_mode: config.computation_mode.as_raw(),
      gpu_device_id: config.gpu_device_id,
      num_threads: config.num_threads,
      ..ffi::SaConfig::default()
    };

    Ok(Self {
      raw,
      _strings: strings,
    })
  }

  pub fn as_ptr(&self) -> *const ffi::SaConfig {
    &self.raw
  }

  pub fn raw(&self) -> &ffi::SaConfig {
    &self.raw
  }
}
