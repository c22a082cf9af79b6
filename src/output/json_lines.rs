// 该文件是 Kanzuo （看座） 项目的一部分。
// src/output/json_lines.rs - JSON Lines 文件输出
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

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use url::Url;

use super::{FrameReport, OutputError, Render};
use crate::{FromUrl, FromUrlWithScheme};

/// `jsonl:///path/to/report.jsonl`，每帧一行 JSON
pub struct JsonLinesOutput {
  path: PathBuf,
  writer: Mutex<BufWriter<File>>,
}

impl JsonLinesOutput {
  pub fn create(path: impl AsRef<Path>) -> Result<Self, OutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)?;
    }

    info!("结果写入: {}", path.display());
    let file = File::create(path)?;
    Ok(Self {
      path: path.to_path_buf(),
      writer: Mutex::new(BufWriter::new(file)),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    let path = urlencoding::decode(url.path())
      .map_err(|e| OutputError::PathDecode(e.to_string()))?;
    Self::create(path.into_owned())
  }
}

impl Render<FrameReport> for JsonLinesOutput {
  type Error = OutputError;

  fn render_result(&self, result: &FrameReport) -> Result<(), Self::Error> {
    let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
    serde_json::to_writer(&mut *writer, result)?;
    writer.write_all(b"\n")?;
    debug!("已写入 {} 的结果", result.frame);
    Ok(())
  }

  fn finish(&self) -> Result<(), Self::Error> {
    let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
    writer.flush()?;
    Ok(())
  }
}
