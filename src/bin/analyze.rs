// 该文件是 Kanzuo （看座） 项目的一部分。
// src/bin/analyze.rs - 检测与座位分类命令行
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use kanzuo::{
  FromUrl, RegionOfInterest, SessionBuilder, WINDOW_LABEL,
  input::InputWrapper,
  output::OutputWrapper,
  task::{AnalyzeTask, Task},
};

/// Kanzuo 参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// SDK 动态库，例如 sa:///opt/sdk/lib/libseatsanalyzer.so?mode=cpu&threads=1
  #[arg(long, value_name = "SDK")]
  pub sdk: Url,
  /// 输入来源，image:///path/img.jpg 或 folder:///path/images
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，log:// 或 jsonl:///path/report.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 需要运行座位分类的检测标签
  #[arg(long, default_value = WINDOW_LABEL)]
  pub label: String,
  /// 检测区域，格式 x,y,width,height
  #[arg(long, value_name = "ROI", value_parser = parse_roi)]
  pub roi: Option<RegionOfInterest>,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn parse_roi(s: &str) -> Result<RegionOfInterest, String> {
  let values = s
    .split(',')
    .map(|v| v.trim().parse::<i32>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| format!("无效的检测区域 {}: {}", s, e))?;
  match values.as_slice() {
    &[x, y, width, height] => Ok(RegionOfInterest::new(x, y, width, height)),
    _ => Err(format!("检测区域需要 4 个整数，实际为 {}", values.len())),
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("SDK: {}", args.sdk);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let session = SessionBuilder::from_url(&args.sdk)?.build()?;
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  AnalyzeTask::default()
    .with_label(args.label)
    .with_roi(args.roi)
    .with_frame_number(args.frame_number)
    .with_interrupt(true)
    .run_task(input, session, output)?;

  Ok(())
}
