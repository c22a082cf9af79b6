// 该文件是 Kanzuo （看座） 项目的一部分。
// src/native.rs - 原生库入口抽象
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

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint};
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

use thiserror::Error;

use crate::ffi;

#[cfg(unix)]
mod library;
#[cfg(unix)]
pub use self::library::{DynamicApi, SharedLibrary};

/// SeatsAnalyzer SDK 的七个入口（外加可选的版本查询）。
///
/// 实现者可以是真实的动态库，也可以是测试中的替身。
/// 所有方法都是 `unsafe`：调用者必须保证指针参数满足 C 头文件中的约定。
pub trait NativeApi: Send + Sync {
  /// `erImageAllocate`
  unsafe fn image_allocate(
    &self,
    image: *mut ffi::ERImage,
    width: c_uint,
    height: c_uint,
    color_model: ffi::ERImageColorModel,
    data_type: ffi::ERImageDataType,
  ) -> c_int;

  /// `erImageFree`
  unsafe fn image_free(&self, image: *mut ffi::ERImage);

  /// `saInit`
  unsafe fn init(
    &self,
    config_path: *const c_char,
    config: *const ffi::SaConfig,
    state: *mut ffi::SAState,
  ) -> c_int;

  /// `saFree`
  unsafe fn free(&self, state: ffi::SAState);

  /// `saRunDet`
  unsafe fn run_det(
    &self,
    state: ffi::SAState,
    image: ffi::ERImage,
    roi: *const ffi::ERRoI,
    result: *mut ffi::SaDetResult,
  ) -> c_int;

  /// `saFreeDetResult`
  unsafe fn free_det_result(&self, state: ffi::SAState, result: *mut ffi::SaDetResult);

  /// `saRunScl`
  unsafe fn run_scl(
    &self,
    state: ffi::SAState,
    image: ffi::ERImage,
    position: *const ffi::ERRotatedRect,
    label: *const c_char,
    result: *mut ffi::SaSclResult,
  ) -> c_int;

  /// `saVersion`，库中没有该符号时返回空指针
  unsafe fn version(&self) -> *const c_char {
    ptr::null()
  }
}

/// 会话与图像共享的原生接口
pub type SharedApi = Arc<dyn NativeApi>;

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("无法打开动态库 {path}: {reason}")]
  Open { path: PathBuf, reason: String },
  #[error("无法加载函数 {symbol}: {reason}")]
  Symbol { symbol: &'static str, reason: String },
  #[error("动态库路径包含 NUL 字符: {0}")]
  InvalidPath(PathBuf),
  #[error("当前平台不支持动态加载 SDK")]
  Unsupported,
}

/// 查询 SDK 版本字符串
pub fn sdk_version(api: &dyn NativeApi) -> Option<String> {
  let version = unsafe { api.version() };
  if version.is_null() {
    return None;
  }
  let version = unsafe { CStr::from_ptr(version) };
  Some(version.to_string_lossy().into_owned())
}
