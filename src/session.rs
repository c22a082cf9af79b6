// 该文件是 Kanzuo （看座） 项目的一部分。
// src/session.rs - 原生会话句柄与调用封装
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

use std::ffi::c_void;
use std::mem;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::slice;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeError, NativeImage};
use crate::ffi;
use crate::geometry::{RegionOfInterest, RotatedRect};
use crate::model::{ClassificationResult, DetectResult, Detection, LabelError, encode_label};
use crate::native::{self, LoadError, SharedApi};

mod builder;
mod config;

pub use self::builder::SessionBuilder;
pub use self::config::{ComputationMode, ConfigError, MarshalledConfig, SessionConfig};

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("会话尚未初始化")]
  NotInitialized,
  #[error("会话已释放")]
  Released,
  #[error("{operation} 失败，错误码 {code}")]
  Native { operation: &'static str, code: i32 },
  #[error("saInit 成功但返回了空状态")]
  NullState,
  #[error("无效的检测标签: {0}")]
  Label(#[from] LabelError),
  #[error("无效的会话地址: {0}")]
  InvalidUrl(String),
  #[error("图像错误: {0}")]
  Bridge(#[from] BridgeError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("加载错误: {0}")]
  Load(#[from] LoadError),
}

#[derive(Debug)]
enum State {
  Uninitialized,
  Initialized(NonNull<c_void>),
  Released,
}

/// 一个原生引擎实例。
///
/// 状态依次为 未初始化 → 已初始化 → 已释放。原生状态只释放一次，
/// 析构时若尚未释放则自动释放。会话持有裸指针，因此不能跨线程移动。
pub struct Session {
  api: SharedApi,
  state: State,
}

impl Session {
  pub fn new(api: SharedApi) -> Self {
    Self {
      api,
      state: State::Uninitialized,
    }
  }

  pub fn api(&self) -> &SharedApi {
    &self.api
  }

  pub fn is_initialized(&self) -> bool {
    matches!(self.state, State::Initialized(_))
  }

  pub fn is_released(&self) -> bool {
    matches!(self.state, State::Released)
  }

  /// 调用 saInit。已初始化的会话再次调用时不做任何事。
  pub fn init(
    &mut self,
    config_path: impl AsRef<Path>,
    config: Option<&SessionConfig>,
  ) -> Result<(), SessionError> {
    match self.state {
      State::Initialized(_) => {
        warn!("会话已初始化，跳过 saInit");
        return Ok(());
      }
      State::Released => return Err(SessionError::Released),
      State::Uninitialized => {}
    }

    let config_path = config_path.as_ref();
    let c_path = config::path_to_cstring(config_path)?;
    let marshalled = config.map(MarshalledConfig::new).transpose()?;
    let config_ptr = marshalled
      .as_ref()
      .map_or(ptr::null(), MarshalledConfig::as_ptr);

    info!("初始化会话，配置文件: {}", config_path.display());
    let mut state: ffi::SAState = ptr::null_mut();
    let code = unsafe { self.api.init(c_path.as_ptr(), config_ptr, &mut state) };
    if code != 0 {
      error!("saInit 失败，错误码 {}", code);
      return Err(SessionError::Native {
        operation: "saInit",
        code,
      });
    }

    let state = NonNull::new(state).ok_or(SessionError::NullState)?;
    self.state = State::Initialized(state);
    info!("会话初始化完成");
    Ok(())
  }

  fn handle(&self) -> Result<ffi::SAState, SessionError> {
    match self.state {
      State::Initialized(state) => Ok(state.as_ptr()),
      State::Uninitialized => Err(SessionError::NotInitialized),
      State::Released => Err(SessionError::Released),
    }
  }

  /// 在图像（或其中的感兴趣区域）上运行检测
  pub fn detect(
    &self,
    image: &NativeImage,
    roi: Option<&RegionOfInterest>,
  ) -> Result<DetectResult, SessionError> {
    let state = self.handle()?;
    let roi = roi.map(|r| ffi::ERRoI::from(*r));
    let roi_ptr = roi.as_ref().map_or(ptr::null(), |r| r as *const ffi::ERRoI);

    let mut result = ffi::SaDetResult::default();
    let code = unsafe { self.api.run_det(state, image.as_raw(), roi_ptr, &mut result) };
    if code != 0 {
      error!("saRunDet 失败，错误码 {}", code);
      if !result.detections.is_null() {
        unsafe { self.api.free_det_result(state, &mut result) };
      }
      return Err(SessionError::Native {
        operation: "saRunDet",
        code,
      });
    }

    let count = usize::try_from(result.num_detections).unwrap_or_default();
    let items: Box<[Detection]> = if count == 0 || result.detections.is_null() {
      Box::default()
    } else {
      let raw = unsafe { slice::from_raw_parts(result.detections, count) };
      raw.iter().map(Detection::from).collect()
    };
    unsafe { self.api.free_det_result(state, &mut result) };

    debug!("检测到 {} 个目标", items.len());
    Ok(DetectResult { items })
  }

  /// 对一个检测位置运行座位分类，`label` 目前只支持 "window"
  pub fn classify(
    &self,
    image: &NativeImage,
    position: &RotatedRect,
    label: &str,
  ) -> Result<ClassificationResult, SessionError> {
    let state = self.handle()?;
    let label = encode_label(label)?;
    let position = ffi::ERRotatedRect::from(*position);

    let mut result = Box::<ffi::SaSclResult>::default();
    let code = unsafe {
      self
        .api
        .run_scl(state, image.as_raw(), &position, label.as_ptr(), &mut *result)
    };
    if code != 0 {
      error!("saRunScl 失败，错误码 {}", code);
      return Err(SessionError::Native {
        operation: "saRunScl",
        code,
      });
    }

    Ok(ClassificationResult::from(&*result))
  }

  /// 释放原生状态，重复调用无副作用
  pub fn release(&mut self) {
    match mem::replace(&mut self.state, State::Released) {
      State::Initialized(state) => {
        unsafe { self.api.free(state.as_ptr()) };
        info!("会话已释放");
      }
      State::Released => warn!("会话已经释放过"),
      State::Uninitialized => debug!("释放未初始化的会话"),
    }
  }

  pub fn sdk_version(&self) -> Option<String> {
    native::sdk_version(&*self.api)
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    if self.is_initialized() {
      self.release();
    }
  }
}
