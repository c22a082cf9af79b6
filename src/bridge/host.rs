// 该文件是 Kanzuo （看座） 项目的一部分。
// src/bridge/host.rs - ndarray 主机图像
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

use std::mem;
use std::slice;

use ndarray::Array3;

use super::{BridgeError, ColorModel, DataType, NativeImage, RawImage};

/// 形状为 (高, 宽, 通道) 的像素数组
#[derive(Debug, Clone, PartialEq)]
pub enum HostPixels {
  U8(Array3<u8>),
  F32(Array3<f32>),
}

impl HostPixels {
  pub fn shape(&self) -> (usize, usize, usize) {
    match self {
      HostPixels::U8(a) => a.dim(),
      HostPixels::F32(a) => a.dim(),
    }
  }

  pub fn data_type(&self) -> DataType {
    match self {
      HostPixels::U8(_) => DataType::U8,
      HostPixels::F32(_) => DataType::F32,
    }
  }

  /// 标准（行主序、连续）布局下的字节视图
  fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      HostPixels::U8(a) => a.as_slice(),
      HostPixels::F32(a) => a.as_slice().map(|s| unsafe {
        slice::from_raw_parts(s.as_ptr().cast::<u8>(), mem::size_of_val(s))
      }),
    }
  }
}

/// 带色彩模型标记的主机图像
#[derive(Debug, Clone, PartialEq)]
pub struct HostImage {
  pub color_model: ColorModel,
  pub pixels: HostPixels,
}

impl HostImage {
  pub fn new(color_model: ColorModel, pixels: HostPixels) -> Self {
    Self {
      color_model,
      pixels,
    }
  }

  pub fn height(&self) -> usize {
    self.pixels.shape().0
  }

  pub fn width(&self) -> usize {
    self.pixels.shape().1
  }

  pub fn channels(&self) -> usize {
    self.pixels.shape().2
  }

  pub(crate) fn with_bytes<R>(
    &self,
    f: impl FnOnce(RawImage<'_>) -> Result<R, BridgeError>,
  ) -> Result<R, BridgeError> {
    let data_type = self.pixels.data_type();
    if !matches!(
      self.color_model,
      ColorModel::Gray | ColorModel::Bgr | ColorModel::Bgra
    ) {
      return Err(BridgeError::Unsupported {
        color_model: self.color_model,
        data_type,
      });
    }

    let (height, width, channels) = self.pixels.shape();
    let expected = self.color_model.num_channels().unwrap_or_default();
    if channels != expected {
      return Err(BridgeError::ShapeMismatch {
        expected,
        actual: channels,
      });
    }

    let data = self.pixels.as_bytes().ok_or(BridgeError::NonContiguous)?;
    let element = data_type.size().unwrap_or_default();
    f(RawImage {
      width,
      height,
      color_model: self.color_model,
      data_type,
      step: width * channels * element,
      data,
    })
  }

  pub(crate) fn from_native(image: &NativeImage) -> Result<Self, BridgeError> {
    let color_model = image.color_model()?;
    let data_type = image.data_type()?;
    let unsupported = BridgeError::Unsupported {
      color_model,
      data_type,
    };

    let element = match data_type {
      DataType::U8 | DataType::F32 => data_type.size().unwrap_or_default(),
      DataType::Unknown => return Err(unsupported),
    };
    let channels = match color_model {
      ColorModel::Gray => 1,
      ColorModel::Bgr => 3,
      _ => return Err(unsupported),
    };
    if image.num_channels() != channels {
      return Err(BridgeError::ShapeMismatch {
        expected: channels,
        actual: image.num_channels(),
      });
    }

    let (height, width) = (image.height(), image.width());
    if image.step() != width * channels * element {
      return Err(BridgeError::NonContiguous);
    }

    let len = height * width * channels;
    let bytes = image.as_bytes();
    if bytes.len() < len * element {
      return Err(BridgeError::BufferTooSmall {
        required: len * element,
        actual: bytes.len(),
      });
    }
    let bytes = &bytes[..len * element];
    let shape = (height, width, channels);

    let pixels = match data_type {
      DataType::U8 => HostPixels::U8(shape_array(shape, bytes.to_vec())?),
      _ => {
        let values = bytes
          .chunks_exact(4)
          .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
          .collect();
        HostPixels::F32(shape_array(shape, values)?)
      }
    };

    Ok(Self::new(color_model, pixels))
  }
}

fn shape_array<T>(shape: (usize, usize, usize), values: Vec<T>) -> Result<Array3<T>, BridgeError> {
  Array3::from_shape_vec(shape, values)
    .map_err(|e| BridgeError::UnexpectedLayout(e.to_string()))
}
