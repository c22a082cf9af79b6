// 该文件是 Kanzuo （看座） 项目的一部分。
// src/geometry.rs - 几何结构
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

use serde::{Deserialize, Serialize};

use crate::ffi;

/// 感兴趣区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOfInterest {
  /// 左上角 x 坐标
  pub x: i32,
  /// 左上角 y 坐标
  pub y: i32,
  /// 宽度，负数表示图像全宽
  pub width: i32,
  /// 高度，负数表示图像全高
  pub height: i32,
}

impl RegionOfInterest {
  pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 覆盖整幅图像的区域
  pub fn full() -> Self {
    Self::new(0, 0, -1, -1)
  }
}

impl Default for RegionOfInterest {
  fn default() -> Self {
    Self::full()
  }
}

impl From<RegionOfInterest> for ffi::ERRoI {
  fn from(roi: RegionOfInterest) -> Self {
    ffi::ERRoI {
      x: roi.x,
      y: roi.y,
      width: roi.width,
      height: roi.height,
    }
  }
}

impl From<ffi::ERRoI> for RegionOfInterest {
  fn from(roi: ffi::ERRoI) -> Self {
    Self::new(roi.x, roi.y, roi.width, roi.height)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

impl Point {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

impl From<ffi::ERPoint2f> for Point {
  fn from(p: ffi::ERPoint2f) -> Self {
    Self::new(p.x, p.y)
  }
}

impl From<Point> for ffi::ERPoint2f {
  fn from(p: Point) -> Self {
    ffi::ERPoint2f { x: p.x, y: p.y }
  }
}

/// 旋转矩形
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotatedRect {
  /// 中心 x 坐标
  pub x: f32,
  /// 中心 y 坐标
  pub y: f32,
  pub width: f32,
  pub height: f32,
  /// 顺时针旋转角度（度）
  pub angle: f32,
}

impl RotatedRect {
  pub fn new(x: f32, y: f32, width: f32, height: f32, angle: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
      angle,
    }
  }

  pub fn center(&self) -> Point {
    Point::new(self.x, self.y)
  }

  /// 四个角点，从左上角开始按顺时针排列
  pub fn corners(&self) -> [Point; 4] {
    let (sin, cos) = self.angle.to_radians().sin_cos();
    let (s, c) = (sin * 0.5, cos * 0.5);

    let bottom_left = Point::new(
      self.x - s * self.height - c * self.width,
      self.y + c * self.height - s * self.width,
    );
    let top_left = Point::new(
      self.x + s * self.height - c * self.width,
      self.y - c * self.height - s * self.width,
    );
    let top_right = Point::new(2.0 * self.x - bottom_left.x, 2.0 * self.y - bottom_left.y);
    let bottom_right = Point::new(2.0 * self.x - top_left.x, 2.0 * self.y - top_left.y);

    [top_left, top_right, bottom_right, bottom_left]
  }

  /// 包含该矩形的最小轴对齐区域
  pub fn bounding_roi(&self) -> RegionOfInterest {
    let corners = self.corners();
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in corners {
      min_x = min_x.min(p.x);
      min_y = min_y.min(p.y);
      max_x = max_x.max(p.x);
      max_y = max_y.max(p.y);
    }

    let x = min_x.floor() as i32;
    let y = min_y.floor() as i32;
    RegionOfInterest::new(x, y, max_x.ceil() as i32 - x, max_y.ceil() as i32 - y)
  }
}

impl From<RotatedRect> for ffi::ERRotatedRect {
  fn from(r: RotatedRect) -> Self {
    ffi::ERRotatedRect {
      x: r.x,
      y: r.y,
      width: r.width,
      height: r.height,
      angle: r.angle,
    }
  }
}

impl From<ffi::ERRotatedRect> for RotatedRect {
  fn from(r: ffi::ERRotatedRect) -> Self {
    Self::new(r.x, r.y, r.width, r.height, r.angle)
  }
}
