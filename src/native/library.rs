// 该文件是 Kanzuo （看座） 项目的一部分。
// src/native/library.rs - 显式链接 SeatsAnalyzer 动态库
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

use std::ffi::{CStr, CString};
use std::mem;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use tracing::{debug, info, warn};

use super::{LoadError, NativeApi};
use crate::ffi;

/// dlopen 得到的动态库句柄，析构时 dlclose
pub struct SharedLibrary {
  handle: NonNull<c_void>,
  path: PathBuf,
}

// dlopen 句柄本身可以跨线程使用
unsafe impl Send for SharedLibrary {}
unsafe impl Sync for SharedLibrary {}

fn last_dl_error() -> String {
  let message = unsafe { libc::dlerror() };
  if message.is_null() {
    "未知错误".to_string()
  } else {
    unsafe { CStr::from_ptr(message) }
      .to_string_lossy()
      .into_owned()
  }
}

impl SharedLibrary {
  /// 打开动态库。`global` 为真时以 RTLD_GLOBAL 打开，供依赖库使用。
  pub fn open(path: impl AsRef<Path>, global: bool) -> Result<Self, LoadError> {
    let path = path.as_ref();
    let c_path = CString::new(path.as_os_str().as_encoded_bytes())
      .map_err(|_| LoadError::InvalidPath(path.to_path_buf()))?;

    let visibility = if global {
      libc::RTLD_GLOBAL
    } else {
      libc::RTLD_LOCAL
    };
    let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | visibility) };

    match NonNull::new(handle) {
      Some(handle) => {
        debug!("已打开动态库: {}", path.display());
        Ok(Self {
          handle,
          path: path.to_path_buf(),
        })
      }
      None => Err(LoadError::Open {
        path: path.to_path_buf(),
        reason: last_dl_error(),
      }),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// 按名称查找函数指针。
  ///
  /// # Safety
  /// `T` 必须是与该符号真实签名一致的函数指针类型。
  pub unsafe fn symbol<T: Copy>(&self, name: &'static CStr) -> Result<T, LoadError> {
    const { assert!(mem::size_of::<T>() == mem::size_of::<*mut c_void>()) };

    unsafe {
      // 清除之前残留的错误
      libc::dlerror();
      let address = libc::dlsym(self.handle.as_ptr(), name.as_ptr());
      if address.is_null() {
        return Err(LoadError::Symbol {
          symbol: symbol_name(name),
          reason: last_dl_error(),
        });
      }
      Ok(mem::transmute_copy::<*mut c_void, T>(&address))
    }
  }
}

impl Drop for SharedLibrary {
  fn drop(&mut self) {
    let ret = unsafe { libc::dlclose(self.handle.as_ptr()) };
    if ret != 0 {
      warn!("关闭动态库 {} 失败: {}", self.path.display(), last_dl_error());
    }
  }
}

fn symbol_name(name: &'static CStr) -> &'static str {
  name.to_str().unwrap_or("<非 UTF-8 符号>")
}

/// 从动态库中解析出的 SDK 函数表
pub struct DynamicApi {
  image_allocate: ffi::fcn_erImageAllocate,
  image_free: ffi::fcn_erImageFree,
  init: ffi::fcn_saInit,
  free: ffi::fcn_saFree,
  run_det: ffi::fcn_saRunDet,
  free_det_result: ffi::fcn_saFreeDetResult,
  run_scl: ffi::fcn_saRunScl,
  version: Option<ffi::fcn_saVersion>,
  // 主库先于依赖库关闭
  library: SharedLibrary,
  _support: Vec<SharedLibrary>,
}

impl DynamicApi {
  /// 打开 SDK 动态库并解析全部入口。依赖库会先以全局可见方式打开。
  pub fn load<P, S>(path: P, support_libraries: S) -> Result<Self, LoadError>
  where
    P: AsRef<Path>,
    S: IntoIterator,
    S::Item: AsRef<Path>,
  {
    let support = support_libraries
      .into_iter()
      .map(|lib| SharedLibrary::open(lib, true))
      .collect::<Result<Vec<_>, _>>()?;

    info!("加载 SDK 动态库: {}", path.as_ref().display());
    let library = SharedLibrary::open(path, false)?;

    unsafe {
      let version = match library.symbol::<ffi::fcn_saVersion>(c"saVersion") {
        Ok(f) => Some(f),
        Err(e) => {
          debug!("{}", e);
          None
        }
      };

      Ok(Self {
        image_allocate: library.symbol(c"erImageAllocate")?,
        image_free: library.symbol(c"erImageFree")?,
        init: library.symbol(c"saInit")?,
        free: library.symbol(c"saFree")?,
        run_det: library.symbol(c"saRunDet")?,
        free_det_result: library.symbol(c"saFreeDetResult")?,
        run_scl: library.symbol(c"saRunScl")?,
        version,
        library,
        _support: support,
      })
    }
  }

  pub fn library_path(&self) -> &Path {
    self.library.path()
  }
}

impl NativeApi for DynamicApi {
  unsafe fn image_allocate(
    &self,
    image: *mut ffi::ERImage,
    width: c_uint,
    height: c_uint,
    color_model: ffi::ERImageColorModel,
    data_type: ffi::ERImageDataType,
  ) -> c_int {
    unsafe { (self.image_allocate)(image, width, height, color_model, data_type) }
  }

  unsafe fn image_free(&self, image: *mut ffi::ERImage) {
    unsafe { (self.image_free)(image) }
  }

  unsafe fn init(
    &self,
    config_path: *const c_char,
    config: *const ffi::SaConfig,
    state: *mut ffi::SAState,
  ) -> c_int {
    unsafe { (self.init)(config_path, config, state) }
  }

  unsafe fn free(&self, state: ffi::SAState) {
    unsafe { (self.free)(state) }
  }

  unsafe fn run_det(
    &self,
    state: ffi::SAState,
    image: ffi::ERImage,
    roi: *const ffi::ERRoI,
    result: *mut ffi::SaDetResult,
  ) -> c_int {
    unsafe { (self.run_det)(state, image, roi, result) }
  }

  unsafe fn free_det_result(&self, state: ffi::SAState, result: *mut ffi::SaDetResult) {
    unsafe { (self.free_det_result)(state, result) }
  }

  unsafe fn run_scl(
    &self,
    state: ffi::SAState,
    image: ffi::ERImage,
    position: *const ffi::ERRotatedRect,
    label: *const c_char,
    result: *mut ffi::SaSclResult,
  ) -> c_int {
    unsafe { (self.run_scl)(state, image, position, label, result) }
  }

  unsafe fn version(&self) -> *const c_char {
    match self.version {
      Some(version) => unsafe { version() },
      None => ptr::null(),
    }
  }
}
