// 该文件是 Kanzuo （看座） 项目的一部分。
// src/model.rs - 检测与座位分类结果
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

use std::fmt;
use std::os::raw::c_char;

use serde::Serialize;
use thiserror::Error;

use crate::ffi;
use crate::geometry::RotatedRect;

/// 目前 saRunScl 唯一支持的检测标签
pub const WINDOW_LABEL: &str = "window";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelError {
  #[error("标签长度 {len} 超出上限 {max}")]
  TooLong { len: usize, max: usize },
  #[error("标签中包含 NUL 字符")]
  InteriorNul,
}

/// 将定长 C 字符数组解码为字符串，空字符串返回 None
pub(crate) fn decode_label(raw: &[c_char]) -> Option<String> {
  let bytes: Vec<u8> = raw
    .iter()
    .map(|&c| c as u8)
    .take_while(|&b| b != 0)
    .collect();
  if bytes.is_empty() {
    None
  } else {
    Some(String::from_utf8_lossy(&bytes).into_owned())
  }
}

/// 将标签编码为 SDK 要求的定长数组，末尾保留 NUL
pub(crate) fn encode_label(label: &str) -> Result<ffi::SaDetectionLabel, LabelError> {
  let bytes = label.as_bytes();
  let max = ffi::SA_LABEL_STRING_LENGTH - 1;
  if bytes.len() > max {
    return Err(LabelError::TooLong {
      len: bytes.len(),
      max,
    });
  }
  if bytes.contains(&0) {
    return Err(LabelError::InteriorNul);
  }

  let mut raw = [0 as c_char; ffi::SA_LABEL_STRING_LENGTH];
  for (dst, &src) in raw.iter_mut().zip(bytes) {
    *dst = src as c_char;
  }
  Ok(raw)
}

/// 单个检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub confidence: f64,
  pub position: RotatedRect,
  pub label: String,
}

impl Detection {
  pub fn is_window(&self) -> bool {
    self.label == WINDOW_LABEL
  }
}

impl From<&ffi::SaDetection> for Detection {
  fn from(raw: &ffi::SaDetection) -> Self {
    Self {
      confidence: raw.confidence,
      position: raw.position.into(),
      label: decode_label(&raw.label).unwrap_or_default(),
    }
  }
}

impl fmt::Display for Detection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "[{:.1}x{:.1} at ({:.1},{:.1})], label {} ({:.2})",
      self.position.width,
      self.position.height,
      self.position.x,
      self.position.y,
      self.label,
      self.confidence
    )
  }
}

/// 一次检测调用的全部结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  /// 标签为 "window" 的检测
  pub fn windows(&self) -> impl Iterator<Item = (usize, &Detection)> {
    self.items.iter().enumerate().filter(|(_, d)| d.is_window())
  }
}

impl<'a> IntoIterator for &'a DetectResult {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

/// 分类任务的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
  No,
  Yes,
  Undetermined,
}

impl Verdict {
  /// SDK 的约定："0" 为否，"1" 为是，"?" 为无法判断
  pub fn parse(result: &str) -> Option<Self> {
    match result {
      "0" => Some(Verdict::No),
      "1" => Some(Verdict::Yes),
      "?" => Some(Verdict::Undetermined),
      _ => None,
    }
  }
}

/// 单个分类任务的结果
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Classification {
  /// SDK 未实现该任务时为 None
  pub result: Option<String>,
  pub confidence: f64,
  /// 依次为 否、是、无法判断 的置信度
  pub confidences: [f64; ffi::NUM_CONF_OUTPUTS],
}

impl Classification {
  pub fn verdict(&self) -> Option<Verdict> {
    self.result.as_deref().and_then(Verdict::parse)
  }

  pub fn is_present(&self) -> bool {
    self.result.is_some()
  }
}

impl From<&ffi::SaClass> for Classification {
  fn from(raw: &ffi::SaClass) -> Self {
    Self {
      result: decode_label(&raw.result),
      confidence: raw.confidence,
      confidences: raw.confidences,
    }
  }
}

impl fmt::Display for Classification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.result {
      Some(result) => write!(f, "\"{}\" ({:.2})", result, self.confidence),
      None => write!(f, "- ({:.2})", self.confidence),
    }
  }
}

/// 一个座位的分类结果
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SeatPosition {
  /// 该位置的图像质量
  pub quality: f64,
  pub occupied: Classification,
  pub driver: Classification,
  pub belt: Classification,
  pub phone: Classification,
}

impl From<&ffi::SaPosition> for SeatPosition {
  fn from(raw: &ffi::SaPosition) -> Self {
    Self {
      quality: raw.quality,
      occupied: (&raw.occupied).into(),
      driver: (&raw.driver).into(),
      belt: (&raw.belt).into(),
      phone: (&raw.phone).into(),
    }
  }
}

impl fmt::Display for SeatPosition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "quality {:.2}, occupied {}, driver {}, belt {}, phone {}",
      self.quality, self.occupied, self.driver, self.belt, self.phone
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatSlot {
  Left,
  Middle,
  Right,
}

impl fmt::Display for SeatSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      SeatSlot::Left => "left",
      SeatSlot::Middle => "middle",
      SeatSlot::Right => "right",
    };
    f.write_str(name)
  }
}

/// 一次座位分类调用的结果，位置以相机视角为准
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClassificationResult {
  pub left: SeatPosition,
  pub middle: SeatPosition,
  pub right: SeatPosition,
}

impl ClassificationResult {
  pub fn seat(&self, slot: SeatSlot) -> &SeatPosition {
    match slot {
      SeatSlot::Left => &self.left,
      SeatSlot::Middle => &self.middle,
      SeatSlot::Right => &self.right,
    }
  }

  pub fn seats(&self) -> [(SeatSlot, &SeatPosition); 3] {
    [
      (SeatSlot::Left, &self.left),
      (SeatSlot::Middle, &self.middle),
      (SeatSlot::Right, &self.right),
    ]
  }
}

impl From<&ffi::SaSclResult> for ClassificationResult {
  fn from(raw: &ffi::SaSclResult) -> Self {
    Self {
      left: (&raw.left).into(),
      middle: (&raw.middle).into(),
      right: (&raw.right).into(),
    }
  }
}
