// 该文件是 Kanzuo （看座） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod directory;
mod read_image_file;

pub use self::directory::DirectoryInput;
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: 期望 {expected}，实际 {actual}")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("不支持的输入地址: {0}")]
  UnsupportedUrl(String),
  #[error("路径解码失败: {0}")]
  PathDecode(String),
  #[error("读取 {path} 失败: {source}")]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("解码图像 {path} 失败: {source}")]
  Decode {
    path: PathBuf,
    source: image::ImageError,
  },
}

/// 一帧待分析的图像
#[derive(Debug, Clone)]
pub struct Frame {
  /// 帧名称，通常是文件名
  pub name: String,
  pub image: DynamicImage,
}

/// 从 URL 中取出解码后的文件系统路径
pub(crate) fn url_path<T: FromUrlWithScheme>(url: &Url) -> Result<PathBuf, InputError> {
  if url.scheme() != T::SCHEME {
    return Err(InputError::SchemeMismatch {
      expected: T::SCHEME,
      actual: url.scheme().to_string(),
    });
  }
  let path = urlencoding::decode(url.path()).map_err(|e| InputError::PathDecode(e.to_string()))?;
  Ok(PathBuf::from(path.into_owned()))
}

pub(crate) fn load_frame(path: &Path) -> Result<Frame, InputError> {
  let image = ImageReader::open(path)
    .map_err(|source| InputError::Io {
      path: path.to_path_buf(),
      source,
    })?
    .decode()
    .map_err(|source| InputError::Decode {
      path: path.to_path_buf(),
      source,
    })?;

  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  Ok(Frame { name, image })
}

pub enum InputWrapper {
  ImageFile(ImageFileInput),
  Directory(DirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ImageFile(ImageFileInput::from_url(url)?)),
      DirectoryInput::SCHEME => Ok(InputWrapper::Directory(DirectoryInput::from_url(url)?)),
      _ => Err(InputError::UnsupportedUrl(url.to_string())),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Result<Frame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ImageFile(input) => input.next(),
      InputWrapper::Directory(input) => input.next(),
    }
  }
}
