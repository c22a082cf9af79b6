// 该文件是 Kanzuo （看座） 项目的一部分。
// src/input/directory.rs - 目录图像输入
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

use std::fs;
use std::path::{Path, PathBuf};
use std::vec;

use tracing::{debug, info};
use url::Url;

use super::{Frame, InputError, load_frame, url_path};
use crate::{FromUrl, FromUrlWithScheme};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// `folder:///path/to/images`，按文件名顺序逐个解码
pub struct DirectoryInput {
  files: vec::IntoIter<PathBuf>,
}

impl DirectoryInput {
  pub fn open(dir: impl AsRef<Path>) -> Result<Self, InputError> {
    let dir = dir.as_ref();
    let io = |source| InputError::Io {
      path: dir.to_path_buf(),
      source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io)? {
      let path = entry.map_err(io)?.path();
      if path.is_file() && is_image(&path) {
        files.push(path);
      } else {
        debug!("跳过非图像文件: {}", path.display());
      }
    }
    files.sort();

    info!("目录 {} 中共有 {} 张图像", dir.display(), files.len());
    Ok(Self {
      files: files.into_iter(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.files.len()
  }
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::open(url_path::<Self>(url)?)
  }
}

impl Iterator for DirectoryInput {
  type Item = Result<Frame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.files.next().map(|path| load_frame(&path))
  }
}
