// 该文件是 Kanzuo （看座） 项目的一部分。
// src/bridge.rs - 主机图像与 ERImage 之间的转换
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

//! # 图像桥接
//!
//! [`NativeImage`] 持有一块由 `erImageAllocate` 分配的 `ERImage`，
//! 并在析构时调用 `erImageFree` 释放，保证每块原生缓冲区只释放一次。
//!
//! 支持三种主机端输入：
//! - [`RawImage`]：原始字节 + 宽、高、行跨度、色彩模型、元素类型
//! - [`HostImage`]：形状为 (高, 宽, 通道) 的 `ndarray` 数组
//! - `image::DynamicImage`（需要 `read_image_file` 特性）
//!
//! 行跨度必须等于 宽 × 每像素字节数，否则直接拒绝。

use std::fmt;
use std::ptr;
use std::slice;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::ffi;
use crate::native::SharedApi;

mod host;
pub use self::host::{HostImage, HostPixels};

#[cfg(feature = "read_image_file")]
mod dynamic_image;

#[derive(Error, Debug)]
pub enum BridgeError {
  #[error("无效的色彩模型: {0}")]
  InvalidColorModel(u32),
  #[error("无效的元素类型: {0}")]
  InvalidDataType(u32),
  #[error("不支持的色彩模型 {color_model} 与元素类型 {data_type} 组合")]
  Unsupported {
    color_model: ColorModel,
    data_type: DataType,
  },
  #[error("不支持的像素格式: {0}")]
  UnsupportedPixelMode(String),
  #[error("行跨度必须等于 {expected} 字节，实际为 {actual}")]
  UnsupportedStride { expected: usize, actual: usize },
  #[error("图像数据不连续")]
  NonContiguous,
  #[error("缓冲区过小: 需要 {required} 字节，实际 {actual}")]
  BufferTooSmall { required: usize, actual: usize },
  #[error("通道数不匹配: 期望 {expected}，实际 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("图像尺寸超出范围: {width}x{height}")]
  DimensionOverflow { width: usize, height: usize },
  #[error("erImageAllocate 失败，错误码 {code}")]
  Allocation { code: i32 },
  #[error("原生图像布局异常: {0}")]
  UnexpectedLayout(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum ColorModel {
  Unknown = ffi::ER_IMAGE_COLORMODEL_UNK,
  Gray = ffi::ER_IMAGE_COLORMODEL_GRAY,
  Bgr = ffi::ER_IMAGE_COLORMODEL_BGR,
  YCbCr420 = ffi::ER_IMAGE_COLORMODEL_YCBCR420,
  Bgra = ffi::ER_IMAGE_COLORMODEL_BGRA,
  YCbCrNv12 = ffi::ER_IMAGE_COLORMODEL_YCBCRNV12,
}

impl ColorModel {
  /// 通道数，未知模型返回 None
  pub fn num_channels(self) -> Option<usize> {
    match self {
      ColorModel::Unknown => None,
      ColorModel::Gray => Some(1),
      ColorModel::Bgr | ColorModel::YCbCr420 | ColorModel::YCbCrNv12 => Some(3),
      ColorModel::Bgra => Some(4),
    }
  }

  /// 亮度平面加二次采样色度平面的格式
  pub fn is_planar(self) -> bool {
    matches!(self, ColorModel::YCbCr420 | ColorModel::YCbCrNv12)
  }

  /// 主平面中每行的元素个数
  pub fn row_elements(self, width: usize) -> Option<usize> {
    if self.is_planar() {
      return Some(width);
    }
    self.num_channels().and_then(|c| c.checked_mul(width))
  }

  /// 需要拷贝的行数，平面格式额外包含一半高度的色度行
  pub fn buffer_rows(self, height: usize) -> usize {
    if self.is_planar() {
      height.saturating_add(height / 2)
    } else {
      height
    }
  }
}

impl TryFrom<u32> for ColorModel {
  type Error = BridgeError;

  fn try_from(value: u32) -> Result<Self, Self::Error> {
    match value {
      ffi::ER_IMAGE_COLORMODEL_UNK => Ok(ColorModel::Unknown),
      ffi::ER_IMAGE_COLORMODEL_GRAY => Ok(ColorModel::Gray),
      ffi::ER_IMAGE_COLORMODEL_BGR => Ok(ColorModel::Bgr),
      ffi::ER_IMAGE_COLORMODEL_YCBCR420 => Ok(ColorModel::YCbCr420),
      ffi::ER_IMAGE_COLORMODEL_BGRA => Ok(ColorModel::Bgra),
      ffi::ER_IMAGE_COLORMODEL_YCBCRNV12 => Ok(ColorModel::YCbCrNv12),
      other => Err(BridgeError::InvalidColorModel(other)),
    }
  }
}

impl fmt::Display for ColorModel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ColorModel::Unknown => "unknown",
      ColorModel::Gray => "gray",
      ColorModel::Bgr => "bgr",
      ColorModel::YCbCr420 => "ycbcr420",
      ColorModel::Bgra => "bgra",
      ColorModel::YCbCrNv12 => "nv12",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum DataType {
  Unknown = ffi::ER_IMAGE_DATATYPE_UNK,
  U8 = ffi::ER_IMAGE_DATATYPE_UCHAR,
  F32 = ffi::ER_IMAGE_DATATYPE_FLOAT,
}

impl DataType {
  /// 单个元素的字节数
  pub fn size(self) -> Option<usize> {
    match self {
      DataType::Unknown => None,
      DataType::U8 => Some(1),
      DataType::F32 => Some(4),
    }
  }
}

impl TryFrom<u32> for DataType {
  type Error = BridgeError;

  fn try_from(value: u32) -> Result<Self, Self::Error> {
    match value {
      ffi::ER_IMAGE_DATATYPE_UNK => Ok(DataType::Unknown),
      ffi::ER_IMAGE_DATATYPE_UCHAR => Ok(DataType::U8),
      ffi::ER_IMAGE_DATATYPE_FLOAT => Ok(DataType::F32),
      other => Err(BridgeError::InvalidDataType(other)),
    }
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      DataType::Unknown => "unknown",
      DataType::U8 => "u8",
      DataType::F32 => "f32",
    };
    f.write_str(name)
  }
}

/// 带有显式布局描述的原始像素数据
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
  pub width: usize,
  pub height: usize,
  pub color_model: ColorModel,
  pub data_type: DataType,
  /// 行跨度（字节）
  pub step: usize,
  pub data: &'a [u8],
}

impl RawImage<'_> {
  /// 按色彩模型与元素类型计算出的连续行跨度
  pub fn expected_step(&self) -> Result<usize, BridgeError> {
    let unsupported = || BridgeError::Unsupported {
      color_model: self.color_model,
      data_type: self.data_type,
    };
    let overflow = || BridgeError::DimensionOverflow {
      width: self.width,
      height: self.height,
    };
    self.color_model.num_channels().ok_or_else(unsupported)?;
    let size = self.data_type.size().ok_or_else(unsupported)?;
    self
      .color_model
      .row_elements(self.width)
      .and_then(|elements| elements.checked_mul(size))
      .ok_or_else(overflow)
  }

  fn validate(&self) -> Result<(), BridgeError> {
    let expected = self.expected_step()?;
    if self.step != expected {
      return Err(BridgeError::UnsupportedStride {
        expected,
        actual: self.step,
      });
    }

    let required = self
      .step
      .checked_mul(self.color_model.buffer_rows(self.height))
      .ok_or(BridgeError::DimensionOverflow {
        width: self.width,
        height: self.height,
      })?;
    if self.data.len() < required {
      return Err(BridgeError::BufferTooSmall {
        required,
        actual: self.data.len(),
      });
    }
    Ok(())
  }
}

/// 由原生库分配、在析构时释放的 ERImage
pub struct NativeImage {
  api: SharedApi,
  raw: Box<ffi::ERImage>,
}

impl fmt::Debug for NativeImage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NativeImage")
      .field("color_model", &self.raw.color_model)
      .field("data_type", &self.raw.data_type)
      .field("width", &self.raw.width)
      .field("height", &self.raw.height)
      .field("num_channels", &self.raw.num_channels)
      .field("step", &self.raw.step)
      .field("data_size", &self.raw.data_size)
      .finish()
  }
}

fn to_c_uint(width: usize, height: usize) -> Result<(u32, u32), BridgeError> {
  match (u32::try_from(width), u32::try_from(height)) {
    (Ok(w), Ok(h)) => Ok((w, h)),
    _ => Err(BridgeError::DimensionOverflow { width, height }),
  }
}

impl NativeImage {
  /// 调用 erImageAllocate 分配一幅空白图像
  pub fn allocate(
    api: &SharedApi,
    width: usize,
    height: usize,
    color_model: ColorModel,
    data_type: DataType,
  ) -> Result<Self, BridgeError> {
    if color_model == ColorModel::Unknown || data_type == DataType::Unknown {
      return Err(BridgeError::Unsupported {
        color_model,
        data_type,
      });
    }
    let (w, h) = to_c_uint(width, height)?;

    let mut raw = Box::new(ffi::ERImage::default());
    let code = unsafe {
      api.image_allocate(
        &mut *raw,
        w,
        h,
        color_model as ffi::ERImageColorModel,
        data_type as ffi::ERImageDataType,
      )
    };
    if code != 0 {
      error!("erImageAllocate 失败: {}x{} {} {}, 错误码 {}", width, height, color_model, data_type, code);
      return Err(BridgeError::Allocation { code });
    }

    debug!(
      "分配原生图像: {}x{} {} {}, step {}, data_size {}",
      raw.width, raw.height, color_model, data_type, raw.step, raw.data_size
    );
    Ok(Self {
      api: Arc::clone(api),
      raw,
    })
  }

  /// 从原始字节构造，行跨度必须与布局一致
  pub fn from_bytes(api: &SharedApi, image: &RawImage<'_>) -> Result<Self, BridgeError> {
    image.validate()?;

    let mut native = Self::allocate(
      api,
      image.width,
      image.height,
      image.color_model,
      image.data_type,
    )?;
    let rows = image.color_model.buffer_rows(image.height);
    native.write_rows(image.data, image.step, rows)?;
    Ok(native)
  }

  /// 逐行写入像素数据；原生行跨度可以更大，但不能更小
  fn write_rows(&mut self, src: &[u8], src_step: usize, rows: usize) -> Result<(), BridgeError> {
    let dst_step = self.raw.step as usize;
    if dst_step < src_step {
      return Err(BridgeError::UnexpectedLayout(format!(
        "原生行跨度 {} 小于输入行跨度 {}",
        dst_step, src_step
      )));
    }
    let required = dst_step * rows;
    if (self.raw.data_size as usize) < required || (required > 0 && self.raw.data.is_null()) {
      return Err(BridgeError::UnexpectedLayout(format!(
        "原生缓冲区 {} 字节，需要 {} 字节",
        self.raw.data_size, required
      )));
    }

    if dst_step == src_step {
      unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.raw.data, required) };
    } else {
      for row in 0..rows {
        let src_row = &src[row * src_step..(row + 1) * src_step];
        unsafe {
          ptr::copy_nonoverlapping(src_row.as_ptr(), self.raw.data.add(row * dst_step), src_step)
        };
      }
    }
    Ok(())
  }

  /// 从 (高, 宽, 通道) 数组构造，支持灰度、BGR、BGRA
  pub fn from_host(api: &SharedApi, image: &HostImage) -> Result<Self, BridgeError> {
    image.with_bytes(|raw| Self::from_bytes(api, &raw))
  }

  /// 转换回 (高, 宽, 通道) 数组，仅支持灰度与 BGR
  pub fn to_host(&self) -> Result<HostImage, BridgeError> {
    HostImage::from_native(self)
  }

  pub fn width(&self) -> usize {
    self.raw.width as usize
  }

  pub fn height(&self) -> usize {
    self.raw.height as usize
  }

  pub fn num_channels(&self) -> usize {
    self.raw.num_channels as usize
  }

  pub fn depth(&self) -> usize {
    self.raw.depth as usize
  }

  pub fn step(&self) -> usize {
    self.raw.step as usize
  }

  pub fn data_size(&self) -> usize {
    self.raw.data_size as usize
  }

  pub fn color_model(&self) -> Result<ColorModel, BridgeError> {
    ColorModel::try_from(self.raw.color_model)
  }

  pub fn data_type(&self) -> Result<DataType, BridgeError> {
    DataType::try_from(self.raw.data_type)
  }

  /// 原生缓冲区的只读视图，生命周期受 self 约束
  pub fn as_bytes(&self) -> &[u8] {
    if self.raw.data.is_null() {
      return &[];
    }
    unsafe { slice::from_raw_parts(self.raw.data, self.data_size()) }
  }

  /// 按值传递给 saRunDet / saRunScl 的结构体副本
  pub(crate) fn as_raw(&self) -> ffi::ERImage {
    *self.raw
  }
}

impl Drop for NativeImage {
  fn drop(&mut self) {
    debug!("释放原生图像: {}x{}", self.raw.width, self.raw.height);
    unsafe { self.api.image_free(&mut *self.raw) };
  }
}
