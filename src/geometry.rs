// 该文件是 Chepai （车牌） 项目的一部分。
// src/geometry.rs - 边界框与 IoU 计算
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

use std::str::FromStr;

/// 参考画面尺寸（像素），标注坐标按此尺寸缩放
pub const REFERENCE_FRAME: u32 = 640;

const IOU_EPSILON: f64 = 1e-6;

/// 中心点 + 宽高形式的边界框，单位为像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoundingBox {
  pub center_x: i32,
  pub center_y: i32,
  pub width: i32,
  pub height: i32,
}

impl BoundingBox {
  /// 宽高为负时截断为 0
  pub fn new(center_x: i32, center_y: i32, width: i32, height: i32) -> Self {
    Self {
      center_x,
      center_y,
      width: width.max(0),
      height: height.max(0),
    }
  }

  /// 从角点形式 (x1, y1, x2, y2) 转换，中心点使用整数除法
  pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    let width = x2 - x1;
    let height = y2 - y1;
    Self::new(x1 + width / 2, y1 + height / 2, width, height)
  }

  /// 从归一化坐标 (x, y, w, h) 缩放到 `frame`×`frame` 像素画面，向零截断
  pub fn from_normalized(x: f64, y: f64, w: f64, h: f64, frame: u32) -> Self {
    Self::from_normalized_in(x, y, w, h, (frame, frame))
  }

  /// 从归一化坐标缩放到 `(width, height)` 像素画面，向零截断
  pub fn from_normalized_in(x: f64, y: f64, w: f64, h: f64, (width, height): (u32, u32)) -> Self {
    let (sx, sy) = (f64::from(width), f64::from(height));
    Self::new(
      (x * sx) as i32,
      (y * sy) as i32,
      (w * sx) as i32,
      (h * sy) as i32,
    )
  }

  /// 把 `from` 尺寸画面中的框映射到 `to` 尺寸画面，整数运算，向零截断
  ///
  /// `from` 的任一边为 0 时原样返回。
  pub fn rescale(&self, from: (u32, u32), to: (u32, u32)) -> Self {
    if from.0 == 0 || from.1 == 0 {
      return *self;
    }
    let map = |v: i32, from: u32, to: u32| (i64::from(v) * i64::from(to) / i64::from(from)) as i32;
    Self::new(
      map(self.center_x, from.0, to.0),
      map(self.center_y, from.1, to.1),
      map(self.width, from.0, to.0),
      map(self.height, from.1, to.1),
    )
  }

  /// 从 `width`×`height` 的源图像映射到参考画面
  pub fn to_reference_frame(&self, width: u32, height: u32) -> Self {
    self.rescale((width, height), (REFERENCE_FRAME, REFERENCE_FRAME))
  }

  /// 角点形式 (x1, y1, x2, y2)
  pub fn to_corners(&self) -> (i32, i32, i32, i32) {
    let x1 = self.center_x - self.width / 2;
    let y1 = self.center_y - self.height / 2;
    (x1, y1, x1 + self.width, y1 + self.height)
  }

  pub fn area(&self) -> i64 {
    i64::from(self.width) * i64::from(self.height)
  }

  pub fn iou(&self, other: &BoundingBox, mode: IouMode) -> f64 {
    match mode {
      IouMode::Legacy => iou(self, other),
      IouMode::Centered => centered_iou(self, other),
    }
  }
}

/// IoU 的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IouMode {
  /// 把中心坐标直接当作左上角代入重叠公式，与历史评测结果保持一致
  #[default]
  Legacy,
  /// 先换算成角点再计算
  Centered,
}

impl FromStr for IouMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "legacy" => Ok(IouMode::Legacy),
      "centered" => Ok(IouMode::Centered),
      other => Err(format!("未知的 IoU 模式: {}", other)),
    }
  }
}

fn overlap(a_start: i64, a_len: i64, b_start: i64, b_len: i64) -> i64 {
  ((a_start + a_len).min(b_start + b_len) - a_start.max(b_start)).max(0)
}

fn ratio(intersection: i64, a: &BoundingBox, b: &BoundingBox) -> f64 {
  let union = a.area() + b.area() - intersection;
  intersection as f64 / (union as f64 + IOU_EPSILON)
}

/// 两个 (center_x, center_y, width, height) 边界框的 IoU
///
/// 每个轴上的交集为 `max(0, min(x1 + w1, x2 + w2) - max(x1, x2))`，
/// 结果为 `交集 / (并集 + 1e-6)`，因此总是有限值。
pub fn iou(box1: &BoundingBox, box2: &BoundingBox) -> f64 {
  let w = overlap(
    box1.center_x.into(),
    box1.width.into(),
    box2.center_x.into(),
    box2.width.into(),
  );
  let h = overlap(
    box1.center_y.into(),
    box1.height.into(),
    box2.center_y.into(),
    box2.height.into(),
  );
  ratio(w * h, box1, box2)
}

/// 先换算为角点后的 IoU
pub fn centered_iou(box1: &BoundingBox, box2: &BoundingBox) -> f64 {
  let (ax, ay, _, _) = box1.to_corners();
  let (bx, by, _, _) = box2.to_corners();
  let w = overlap(ax.into(), box1.width.into(), bx.into(), box2.width.into());
  let h = overlap(ay.into(), box1.height.into(), by.into(), box2.height.into());
  ratio(w * h, box1, box2)
}
