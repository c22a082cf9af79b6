// 该文件是 Kanzuo （看座） 项目的一部分。
// tests/common/mod.rs - 计数的原生库替身
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

#![allow(dead_code)]

use std::collections::HashSet;
use std::ffi::{CStr, c_void};
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kanzuo::ffi;
use kanzuo::native::{NativeApi, SharedApi};

/// saInit 收到的配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedInit {
  pub config_path: String,
  pub det_sdk_directory: Option<String>,
  pub scl_model_filename: Option<String>,
  pub computation_mode: Option<u32>,
  pub gpu_device_id: Option<i32>,
  pub num_threads: Option<i32>,
  pub callbacks_null: bool,
}

#[derive(Default)]
pub struct FakeNative {
  pub allocations: AtomicUsize,
  pub image_frees: AtomicUsize,
  pub double_frees: AtomicUsize,
  pub inits: AtomicUsize,
  pub state_frees: AtomicUsize,
  pub det_calls: AtomicUsize,
  pub det_frees: AtomicUsize,
  pub scl_calls: AtomicUsize,

  /// 非零时 erImageAllocate 返回该错误码
  pub fail_allocate: c_int,
  pub fail_init: c_int,
  pub fail_det: c_int,
  pub fail_scl: c_int,
  /// saRunDet 失败时仍然分配检测数组
  pub det_leaves_buffer_on_failure: bool,
  /// 原生行跨度在连续跨度上额外增加的字节数
  pub stride_padding: usize,
  pub with_version: bool,

  pub detections: Vec<ffi::SaDetection>,
  pub classification: ffi::SaSclResult,

  pub allocated_images: Mutex<HashSet<usize>>,
  pub outstanding_det_buffers: AtomicUsize,
  pub last_init: Mutex<Option<CapturedInit>>,
  pub last_label: Mutex<Option<String>>,
  pub last_position: Mutex<Option<ffi::ERRotatedRect>>,
  pub last_roi: Mutex<Option<ffi::ERRoI>>,
}

impl FakeNative {
  pub fn shared(self) -> (Arc<FakeNative>, SharedApi) {
    let fake = Arc::new(self);
    let api: SharedApi = fake.clone();
    (fake, api)
  }

  pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }

  pub fn live_images(&self) -> usize {
    self.allocated_images.lock().unwrap().len()
  }

  pub fn live_det_buffers(&self) -> usize {
    self.outstanding_det_buffers.load(Ordering::SeqCst)
  }

  fn alloc_detections(&self, result: *mut ffi::SaDetResult, items: Vec<ffi::SaDetection>) {
    let result = unsafe { &mut *result };
    if items.is_empty() {
      result.num_detections = 0;
      result.detections = ptr::null_mut();
      return;
    }
    result.num_detections = items.len() as c_int;
    result.detections = Box::into_raw(items.into_boxed_slice()) as *mut ffi::SaDetection;
    self.outstanding_det_buffers.fetch_add(1, Ordering::SeqCst);
  }
}

fn opt_string(p: *const c_char) -> Option<String> {
  if p.is_null() {
    None
  } else {
    Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
  }
}

pub fn label(text: &str) -> ffi::SaDetectionLabel {
  let mut raw = [0 as c_char; ffi::SA_LABEL_STRING_LENGTH];
  for (dst, &src) in raw.iter_mut().zip(text.as_bytes()) {
    *dst = src as c_char;
  }
  raw
}

pub fn detection(text: &str, confidence: f64, position: ffi::ERRotatedRect) -> ffi::SaDetection {
  ffi::SaDetection {
    confidence,
    position,
    label: label(text),
  }
}

pub fn class(result: &str, confidence: f64) -> ffi::SaClass {
  ffi::SaClass {
    result: label(result),
    confidence,
    confidences: [1.0 - confidence, confidence, 0.0],
  }
}

impl NativeApi for FakeNative {
  unsafe fn image_allocate(
    &self,
    image: *mut ffi::ERImage,
    width: c_uint,
    height: c_uint,
    color_model: ffi::ERImageColorModel,
    data_type: ffi::ERImageDataType,
  ) -> c_int {
    if self.fail_allocate != 0 {
      return self.fail_allocate;
    }

    let channels: usize = match color_model {
      ffi::ER_IMAGE_COLORMODEL_GRAY => 1,
      ffi::ER_IMAGE_COLORMODEL_BGRA => 4,
      _ => 3,
    };
    let element: usize = if data_type == ffi::ER_IMAGE_DATATYPE_FLOAT { 4 } else { 1 };
    let planar = matches!(
      color_model,
      ffi::ER_IMAGE_COLORMODEL_YCBCR420 | ffi::ER_IMAGE_COLORMODEL_YCBCRNV12
    );
    let (w, h) = (width as usize, height as usize);
    let row_elements = if planar { w } else { w * channels };
    let step = row_elements * element + self.stride_padding;
    let rows = if planar { h + h / 2 } else { h };
    let data_size = step * rows;

    let buffer = vec![0u8; data_size].into_boxed_slice();
    let data = Box::into_raw(buffer) as *mut u8;
    self.allocated_images.lock().unwrap().insert(data as usize);
    self.allocations.fetch_add(1, Ordering::SeqCst);

    let image = unsafe { &mut *image };
    image.color_model = color_model;
    image.data_type = data_type;
    image.width = width;
    image.height = height;
    image.num_channels = channels as c_uint;
    image.depth = element as c_uint;
    image.step = step as c_uint;
    image.size = (w * h * channels) as c_uint;
    image.data_size = data_size as c_uint;
    image.data = data;
    image.row_data = ptr::null_mut();
    image.data_allocated = 1;
    0
  }

  unsafe fn image_free(&self, image: *mut ffi::ERImage) {
    let image = unsafe { &mut *image };
    self.image_frees.fetch_add(1, Ordering::SeqCst);
    if !self.allocated_images.lock().unwrap().remove(&(image.data as usize)) {
      self.double_frees.fetch_add(1, Ordering::SeqCst);
      return;
    }
    let slice = ptr::slice_from_raw_parts_mut(image.data, image.data_size as usize);
    drop(unsafe { Box::from_raw(slice) });
    image.data = ptr::null_mut();
    image.data_allocated = 0;
  }

  unsafe fn init(
    &self,
    config_path: *const c_char,
    config: *const ffi::SaConfig,
    state: *mut ffi::SAState,
  ) -> c_int {
    let mut captured = CapturedInit {
      config_path: opt_string(config_path).unwrap_or_default(),
      ..CapturedInit::default()
    };
    if let Some(config) = unsafe { config.as_ref() } {
      captured.det_sdk_directory = opt_string(config.det_sdk_directory);
      captured.scl_model_filename = opt_string(config.scl_model_filename);
      captured.computation_mode = Some(config.computation_mode);
      captured.gpu_device_id = Some(config.gpu_device_id);
      captured.num_threads = Some(config.num_threads);
      captured.callbacks_null =
        config.det_inference_callback.is_none() && config.scl_inference_callback.is_none();
    }
    *self.last_init.lock().unwrap() = Some(captured);
    self.inits.fetch_add(1, Ordering::SeqCst);

    if self.fail_init != 0 {
      return self.fail_init;
    }
    unsafe { *state = Box::into_raw(Box::new(0xC0FFEEu32)) as *mut c_void };
    0
  }

  unsafe fn free(&self, state: ffi::SAState) {
    self.state_frees.fetch_add(1, Ordering::SeqCst);
    drop(unsafe { Box::from_raw(state as *mut u32) });
  }

  unsafe fn run_det(
    &self,
    _state: ffi::SAState,
    image: ffi::ERImage,
    roi: *const ffi::ERRoI,
    result: *mut ffi::SaDetResult,
  ) -> c_int {
    self.det_calls.fetch_add(1, Ordering::SeqCst);
    assert!(!image.data.is_null());
    *self.last_roi.lock().unwrap() = unsafe { roi.as_ref() }.copied();

    if self.fail_det != 0 {
      if self.det_leaves_buffer_on_failure {
        self.alloc_detections(result, self.detections.clone());
      }
      return self.fail_det;
    }
    self.alloc_detections(result, self.detections.clone());
    0
  }

  unsafe fn free_det_result(&self, _state: ffi::SAState, result: *mut ffi::SaDetResult) {
    self.det_frees.fetch_add(1, Ordering::SeqCst);
    let result = unsafe { &mut *result };
    if !result.detections.is_null() {
      let slice = ptr::slice_from_raw_parts_mut(result.detections, result.num_detections as usize);
      drop(unsafe { Box::from_raw(slice) });
      self.outstanding_det_buffers.fetch_sub(1, Ordering::SeqCst);
    }
    result.detections = ptr::null_mut();
    result.num_detections = 0;
  }

  unsafe fn run_scl(
    &self,
    _state: ffi::SAState,
    _image: ffi::ERImage,
    position: *const ffi::ERRotatedRect,
    label: *const c_char,
    result: *mut ffi::SaSclResult,
  ) -> c_int {
    self.scl_calls.fetch_add(1, Ordering::SeqCst);
    *self.last_label.lock().unwrap() = opt_string(label);
    *self.last_position.lock().unwrap() = unsafe { position.as_ref() }.copied();

    if self.fail_scl != 0 {
      return self.fail_scl;
    }
    unsafe { *result = self.classification };
    0
  }

  unsafe fn version(&self) -> *const c_char {
    if self.with_version {
      c"fake-sa 2.1.0".as_ptr()
    } else {
      ptr::null()
    }
  }
}
