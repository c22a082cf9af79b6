// 该文件是 Kanzuo （看座） 项目的一部分。
// src/task.rs - 检测与座位分类任务
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

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeError, NativeImage};
use crate::geometry::RegionOfInterest;
use crate::input::{Frame, InputError};
use crate::model::WINDOW_LABEL;
use crate::output::{FrameReport, Render};
use crate::native::SharedApi;
use crate::session::Session;

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 累计的检测与分类耗时
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SpeedStats {
  pub detector: Duration,
  pub detector_runs: u32,
  pub classifier: Duration,
  pub classifier_runs: u32,
}

fn per_eval_ms(total: Duration, runs: u32) -> Option<f64> {
  (runs > 0).then(|| total.as_secs_f64() * 1000.0 / runs as f64)
}

impl SpeedStats {
  pub fn record_detection(&mut self, elapsed: Duration) {
    self.detector += elapsed;
    self.detector_runs += 1;
  }

  pub fn record_classification(&mut self, elapsed: Duration) {
    self.classifier += elapsed;
    self.classifier_runs += 1;
  }

  /// 每次检测的平均毫秒数
  pub fn detector_ms(&self) -> Option<f64> {
    per_eval_ms(self.detector, self.detector_runs)
  }

  pub fn classifier_ms(&self) -> Option<f64> {
    per_eval_ms(self.classifier, self.classifier_runs)
  }

  pub fn log(&self) {
    match self.detector_ms() {
      Some(ms) if ms > 0.0 => info!("检测速度: {:.2} ms/次 ({:.2} Hz)", ms, 1000.0 / ms),
      Some(ms) => info!("检测速度: {:.2} ms/次", ms),
      None => info!("未运行检测"),
    }
    match self.classifier_ms() {
      Some(ms) if ms > 0.0 => info!("分类速度: {:.2} ms/次 ({:.2} Hz)", ms, 1000.0 / ms),
      Some(ms) => info!("分类速度: {:.2} ms/次", ms),
      None => info!("未运行分类"),
    }
  }
}

/// 桥接不直接支持的像素格式（灰度透明、16 位等）先转换为 RGB8
fn bridge_frame(api: &SharedApi, image: &DynamicImage) -> Result<NativeImage, BridgeError> {
  match NativeImage::from_dynamic_image(api, image) {
    Err(BridgeError::UnsupportedPixelMode(mode)) => {
      debug!("像素格式 {} 转换为 RGB8", mode);
      NativeImage::from_dynamic_image(api, &DynamicImage::ImageRgb8(image.to_rgb8()))
    }
    other => other,
  }
}

/// 逐帧检测，并对每个窗户检测运行座位分类。
///
/// 单帧失败只记录日志并跳过，输出失败会终止任务。
#[derive(Debug, Clone)]
pub struct AnalyzeTask {
  label: String,
  roi: Option<RegionOfInterest>,
  frame_number: Option<usize>,
  handle_interrupt: bool,
}

impl Default for AnalyzeTask {
  fn default() -> Self {
    Self {
      label: WINDOW_LABEL.to_string(),
      roi: None,
      frame_number: None,
      handle_interrupt: false,
    }
  }
}

impl AnalyzeTask {
  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn with_roi(mut self, roi: Option<RegionOfInterest>) -> Self {
    self.roi = roi;
    self
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号后处理完当前帧再退出
  pub fn with_interrupt(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }

  fn install_interrupt(&self) -> Option<Receiver<()>> {
    if !self.handle_interrupt {
      return None;
    }

    let (tx, rx) = mpsc::channel();
    let installed = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });

    match installed {
      Ok(()) => Some(rx),
      Err(e) => {
        warn!("无法设置 Ctrl-C 处理器: {}", e);
        None
      }
    }
  }

  /// 分析一帧。图像转换或检测失败时返回 None。
  pub fn analyze_frame(
    &self,
    session: &Session,
    frame: &Frame,
    stats: &mut SpeedStats,
  ) -> Option<FrameReport> {
    let image = match bridge_frame(session.api(), &frame.image) {
      Ok(image) => image,
      Err(e) => {
        warn!("跳过 {}: {}", frame.name, e);
        return None;
      }
    };

    let now = Instant::now();
    let detections = match session.detect(&image, self.roi.as_ref()) {
      Ok(detections) => detections,
      Err(e) => {
        error!("{} 检测失败: {}", frame.name, e);
        return None;
      }
    };
    stats.record_detection(now.elapsed());
    info!("{}: 找到 {} 个检测", frame.name, detections.len());

    let mut report = FrameReport::new(frame.name.clone(), &detections);
    for (index, detection) in detections.iter().enumerate() {
      if detection.label != self.label {
        continue;
      }

      let now = Instant::now();
      match session.classify(&image, &detection.position, &detection.label) {
        Ok(seats) => {
          stats.record_classification(now.elapsed());
          report.push_window(index, seats);
        }
        Err(e) => warn!("{} 第 {} 个检测分类失败: {}", frame.name, index, e),
      }
    }

    Some(report)
  }
}

impl<I, O, RE> Task<I, Session, O> for AnalyzeTask
where
  I: Iterator<Item = Result<Frame, InputError>>,
  O: Render<FrameReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: Session, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupt = self.install_interrupt();
    let mut stats = SpeedStats::default();

    let mut frame_index = 0;
    for frame in input {
      frame_index += 1;
      match frame {
        Ok(frame) => {
          info!("处理第 {} 帧图像: {}", frame_index, frame.name);
          if let Some(report) = self.analyze_frame(&session, &frame, &mut stats) {
            output.render_result(&report)?;
          }
        }
        Err(e) => warn!("读取第 {} 帧失败: {}", frame_index, e),
      }

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    output.finish()?;
    stats.log();
    info!("任务完成，退出");
    Ok(())
  }
}
