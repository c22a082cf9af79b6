// 该文件是 Kanzuo （看座） 项目的一部分。
// src/bridge/dynamic_image.rs - image::DynamicImage 转换
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

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use super::{BridgeError, ColorModel, DataType, NativeImage, RawImage};
use crate::native::SharedApi;

/// 交换每个像素的第 0 与第 2 通道（RGB <-> BGR）
fn swap_red_blue<T: Copy>(data: &[T], channels: usize) -> Vec<T> {
  let mut out = data.to_vec();
  for px in out.chunks_exact_mut(channels) {
    px.swap(0, 2);
  }
  out
}

impl NativeImage {
  /// 从解码后的图像构造。RGB 与 RGBA 会被转换为 BGR 与 BGRA。
  pub fn from_dynamic_image(api: &SharedApi, img: &DynamicImage) -> Result<Self, BridgeError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    debug!("转换图像: {}x{} {:?}", width, height, img.color());

    match img {
      DynamicImage::ImageLuma8(buf) => Self::from_bytes(
        api,
        &RawImage {
          width,
          height,
          color_model: ColorModel::Gray,
          data_type: DataType::U8,
          step: width,
          data: buf.as_raw(),
        },
      ),
      DynamicImage::ImageRgb8(buf) => {
        let bgr = swap_red_blue(buf.as_raw(), 3);
        Self::from_bytes(
          api,
          &RawImage {
            width,
            height,
            color_model: ColorModel::Bgr,
            data_type: DataType::U8,
            step: width * 3,
            data: &bgr,
          },
        )
      }
      DynamicImage::ImageRgba8(buf) => {
        let bgra = swap_red_blue(buf.as_raw(), 4);
        Self::from_bytes(
          api,
          &RawImage {
            width,
            height,
            color_model: ColorModel::Bgra,
            data_type: DataType::U8,
            step: width * 4,
            data: &bgra,
          },
        )
      }
      DynamicImage::ImageRgb32F(buf) => {
        let bgr = swap_red_blue(buf.as_raw(), 3);
        let bytes: Vec<u8> = bgr.iter().flat_map(|v| v.to_ne_bytes()).collect();
        Self::from_bytes(
          api,
          &RawImage {
            width,
            height,
            color_model: ColorModel::Bgr,
            data_type: DataType::F32,
            step: width * 3 * 4,
            data: &bytes,
          },
        )
      }
      other => Err(BridgeError::UnsupportedPixelMode(format!(
        "{:?}",
        other.color()
      ))),
    }
  }

  /// 转换回 `DynamicImage`，仅支持字节型灰度与 BGR
  pub fn to_dynamic_image(&self) -> Result<DynamicImage, BridgeError> {
    let color_model = self.color_model()?;
    let data_type = self.data_type()?;
    if data_type != DataType::U8 {
      return Err(BridgeError::Unsupported {
        color_model,
        data_type,
      });
    }

    let (width, height) = (self.width(), self.height());
    let layout = |len: usize| {
      BridgeError::UnexpectedLayout(format!("{}x{} {} 图像缓冲区长度 {}", width, height, color_model, len))
    };

    match color_model {
      ColorModel::Gray => {
        let data = self.contiguous_rows(width)?;
        let len = data.len();
        GrayImage::from_raw(width as u32, height as u32, data)
          .map(DynamicImage::ImageLuma8)
          .ok_or_else(|| layout(len))
      }
      ColorModel::Bgr => {
        let data = swap_red_blue(&self.contiguous_rows(width * 3)?, 3);
        let len = data.len();
        RgbImage::from_raw(width as u32, height as u32, data)
          .map(DynamicImage::ImageRgb8)
          .ok_or_else(|| layout(len))
      }
      _ => Err(BridgeError::Unsupported {
        color_model,
        data_type,
      }),
    }
  }

  /// 去掉行尾填充后的像素字节
  fn contiguous_rows(&self, row_bytes: usize) -> Result<Vec<u8>, BridgeError> {
    let step = self.step();
    let bytes = self.as_bytes();
    let height = self.height();
    if row_bytes == 0 || height == 0 {
      return Ok(Vec::new());
    }
    if step < row_bytes || bytes.len() < step * height {
      return Err(BridgeError::UnexpectedLayout(format!(
        "行跨度 {}，行字节 {}，缓冲区 {}",
        step,
        row_bytes,
        bytes.len()
      )));
    }

    let mut out = Vec::with_capacity(row_bytes * height);
    for row in bytes.chunks(step).take(height) {
      out.extend_from_slice(&row[..row_bytes]);
    }
    Ok(out)
  }
}
