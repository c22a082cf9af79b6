// 该文件是 Kanzuo （看座） 项目的一部分。
// src/output.rs - 分析结果输出
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

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::model::{ClassificationResult, DetectResult, Detection};
use crate::{FromUrl, FromUrlWithScheme};

mod json_lines;
mod log_output;

pub use self::json_lines::JsonLinesOutput;
pub use self::log_output::LogOutput;

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;

  /// 全部帧处理完成后调用
  fn finish(&self) -> Result<(), Self::Error> {
    Ok(())
  }
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径解码失败: {0}")]
  PathDecode(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("输出已被并发写入者破坏")]
  Poisoned,
}

/// 对一个窗户检测的座位分类
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
  /// 在 `detections` 中的下标
  pub detection: usize,
  pub seats: ClassificationResult,
}

/// 一帧的完整分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
  pub frame: String,
  pub timestamp: String,
  pub detections: Vec<Detection>,
  pub windows: Vec<WindowReport>,
}

impl FrameReport {
  pub fn new(frame: impl Into<String>, detections: &DetectResult) -> Self {
    Self {
      frame: frame.into(),
      timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
      detections: detections.iter().cloned().collect(),
      windows: Vec::new(),
    }
  }

  pub fn push_window(&mut self, detection: usize, seats: ClassificationResult) {
    self.windows.push(WindowReport { detection, seats });
  }
}

pub enum OutputWrapper {
  Log(LogOutput),
  JsonLines(JsonLinesOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      JsonLinesOutput::SCHEME => Ok(OutputWrapper::JsonLines(JsonLinesOutput::from_url(url)?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<FrameReport> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &FrameReport) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output.render_result(result),
      OutputWrapper::JsonLines(output) => output.render_result(result),
    }
  }

  fn finish(&self) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output.finish(),
      OutputWrapper::JsonLines(output) => output.finish(),
    }
  }
}
