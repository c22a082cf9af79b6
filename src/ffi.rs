// 该文件是 Kanzuo （看座） 项目的一部分。
// src/ffi.rs - SeatsAnalyzer SDK 的 C 结构体与函数指针声明
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

//! 与 `er_type.h`、`er_image.h`、`SeatsAnalyzerType.h` 一一对应的原始声明。
//!
//! 本模块只描述内存布局，不做任何安全封装。所有结构体都是 `#[repr(C)]`，
//! 枚举以 C 的 `unsigned int` 表示，以便接收 SDK 返回的任意数值后再做校验。

#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{c_char, c_double, c_float, c_int, c_uchar, c_uint, c_void};
use std::ptr;

/// 标签字符串长度（含结尾 NUL）
pub const SA_LABEL_STRING_LENGTH: usize = 255;
/// SDK 接受的最长路径
pub const SA_MAX_PATH: usize = 4096;
/// 每个分类任务的置信度输出个数：假、真、无法判断
pub const NUM_CONF_OUTPUTS: usize = 3;

pub type ERImageColorModel = c_uint;
pub const ER_IMAGE_COLORMODEL_UNK: ERImageColorModel = 0;
pub const ER_IMAGE_COLORMODEL_GRAY: ERImageColorModel = 1;
pub const ER_IMAGE_COLORMODEL_BGR: ERImageColorModel = 2;
pub const ER_IMAGE_COLORMODEL_YCBCR420: ERImageColorModel = 3;
pub const ER_IMAGE_COLORMODEL_BGRA: ERImageColorModel = 4;
pub const ER_IMAGE_COLORMODEL_YCBCRNV12: ERImageColorModel = 5;

pub type ERImageDataType = c_uint;
pub const ER_IMAGE_DATATYPE_UNK: ERImageDataType = 0;
pub const ER_IMAGE_DATATYPE_UCHAR: ERImageDataType = 1;
pub const ER_IMAGE_DATATYPE_FLOAT: ERImageDataType = 2;

pub type ERComputationMode = c_uint;
pub const ER_COMPUTATION_MODE_CPU: ERComputationMode = 0;
pub const ER_COMPUTATION_MODE_GPU: ERComputationMode = 1;
pub const ER_COMPUTATION_MODE_TPU: ERComputationMode = 2;

/// SDK 图像结构
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ERImage {
  pub color_model: ERImageColorModel,
  pub data_type: ERImageDataType,
  pub width: c_uint,
  pub height: c_uint,
  pub num_channels: c_uint,
  /// 单个元素的字节数
  pub depth: c_uint,
  /// 行跨度（字节）
  pub step: c_uint,
  pub size: c_uint,
  pub data_size: c_uint,
  pub data: *mut c_uchar,
  pub row_data: *mut *mut c_uchar,
  pub data_allocated: c_uchar,
}

impl Default for ERImage {
  fn default() -> Self {
    Self {
      color_model: ER_IMAGE_COLORMODEL_UNK,
      data_type: ER_IMAGE_DATATYPE_UNK,
      width: 0,
      height: 0,
      num_channels: 0,
      depth: 0,
      step: 0,
      size: 0,
      data_size: 0,
      data: ptr::null_mut(),
      row_data: ptr::null_mut(),
      data_allocated: 0,
    }
  }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ERPoint2i {
  pub x: c_int,
  pub y: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ERPoint2f {
  pub x: c_float,
  pub y: c_float,
}

pub type ERPoint = ERPoint2f;

/// 感兴趣区域，宽或高为负数表示整幅图像
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ERRoI {
  pub x: c_int,
  pub y: c_int,
  pub width: c_int,
  pub height: c_int,
}

/// 旋转矩形，角度为顺时针方向的度数
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ERRotatedRect {
  pub x: c_float,
  pub y: c_float,
  pub width: c_float,
  pub height: c_float,
  pub angle: c_float,
}

/// SDK 状态句柄
pub type SAState = *mut c_void;

/// 固定长度的检测标签
pub type SaDetectionLabel = [c_char; SA_LABEL_STRING_LENGTH];

/// 外部推理回调，本绑定始终置空
pub type fcn_saInferenceCallback = Option<unsafe extern "C" fn(*const ERImage, *mut c_uchar) -> c_int>;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SaConfig {
  pub det_sdk_directory: *const c_char,
  pub det_config_directory: *const c_char,
  pub det_config_file: *const c_char,

  pub scl_model_directory: *const c_char,
  pub scl_model_filename: *const c_char,
  pub scl_model_p_table_filename: *const c_char,

  pub computation_mode: ERComputationMode,
  pub gpu_device_id: c_int,
  pub num_threads: c_int,

  pub det_inference_callback: fcn_saInferenceCallback,
  pub det_inference_output_buffer_size: c_uint,
  pub scl_inference_callback: fcn_saInferenceCallback,
  pub scl_inference_output_buffer_size: c_uint,
}

impl Default for SaConfig {
  fn default() -> Self {
    Self {
      det_sdk_directory: ptr::null(),
      det_config_directory: ptr::null(),
      det_config_file: ptr::null(),
      scl_model_directory: ptr::null(),
      scl_model_filename: ptr::null(),
      scl_model_p_table_filename: ptr::null(),
      computation_mode: ER_COMPUTATION_MODE_CPU,
      gpu_device_id: 0,
      num_threads: 0,
      det_inference_callback: None,
      det_inference_output_buffer_size: 0,
      scl_inference_callback: None,
      scl_inference_output_buffer_size: 0,
    }
  }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct SaDetection {
  pub confidence: c_double,
  pub position: ERRotatedRect,
  pub label: SaDetectionLabel,
}

impl Default for SaDetection {
  fn default() -> Self {
    Self {
      confidence: 0.0,
      position: ERRotatedRect::default(),
      label: [0; SA_LABEL_STRING_LENGTH],
    }
  }
}

/// 检测结果数组，由 saRunDet 分配，必须通过 saFreeDetResult 释放
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SaDetResult {
  pub num_detections: c_int,
  pub detections: *mut SaDetection,
}

impl Default for SaDetResult {
  fn default() -> Self {
    Self {
      num_detections: 0,
      detections: ptr::null_mut(),
    }
  }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct SaClass {
  pub result: [c_char; SA_LABEL_STRING_LENGTH],
  pub confidence: c_double,
  pub confidences: [c_double; NUM_CONF_OUTPUTS],
}

impl Default for SaClass {
  fn default() -> Self {
    Self {
      result: [0; SA_LABEL_STRING_LENGTH],
      confidence: 0.0,
      confidences: [0.0; NUM_CONF_OUTPUTS],
    }
  }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SaPosition {
  pub quality: c_double,
  pub occupied: SaClass,
  pub driver: SaClass,
  pub belt: SaClass,
  pub phone: SaClass,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SaSclResult {
  pub left: SaPosition,
  pub middle: SaPosition,
  pub right: SaPosition,
}

// 显式链接所用的函数指针类型
pub type fcn_erImageAllocate = unsafe extern "C" fn(
  image: *mut ERImage,
  width: c_uint,
  height: c_uint,
  color_model: ERImageColorModel,
  data_type: ERImageDataType,
) -> c_int;
pub type fcn_erImageFree = unsafe extern "C" fn(image: *mut ERImage);
pub type fcn_saVersion = unsafe extern "C" fn() -> *const c_char;
pub type fcn_saInit = unsafe extern "C" fn(
  sa_config_path: *const c_char,
  sa_config: *const SaConfig,
  sa_state: *mut SAState,
) -> c_int;
pub type fcn_saFree = unsafe extern "C" fn(sa_state: SAState);
pub type fcn_saRunDet = unsafe extern "C" fn(
  sa_state: SAState,
  image: ERImage,
  bounding_box: *const ERRoI,
  result: *mut SaDetResult,
) -> c_int;
pub type fcn_saFreeDetResult = unsafe extern "C" fn(sa_state: SAState, result: *mut SaDetResult);
pub type fcn_saRunScl = unsafe extern "C" fn(
  sa_state: SAState,
  image: ERImage,
  position: *const ERRotatedRect,
  detection_label: *const c_char,
  result: *mut SaSclResult,
) -> c_int;
