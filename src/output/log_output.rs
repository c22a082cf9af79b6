// 该文件是 Kanzuo （看座） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use tracing::info;
use url::Url;

use super::{FrameReport, OutputError, Render};
use crate::{FromUrl, FromUrlWithScheme};

/// `log://`，把结果写入 tracing 日志
#[derive(Debug, Default)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogOutput)
  }
}

impl Render<FrameReport> for LogOutput {
  type Error = OutputError;

  fn render_result(&self, result: &FrameReport) -> Result<(), Self::Error> {
    info!("{}: 共 {} 个检测", result.frame, result.detections.len());
    for (i, detection) in result.detections.iter().enumerate() {
      info!(" {}. {}", i, detection);
    }
    for window in &result.windows {
      info!(" 窗户 {} 的座位分类:", window.detection);
      for (slot, seat) in window.seats.seats() {
        info!("  - {:<6} {}", slot.to_string(), seat);
      }
    }
    Ok(())
  }
}
