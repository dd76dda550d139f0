// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/draw.rs - 检测结果与真值的可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
  frame::Frame,
  geometry::{BoundingBox, REFERENCE_FRAME},
  output::DetectionSample,
};

const PREDICTION_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TRUTH_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const LINE_THICKNESS: i32 = 2;

pub struct Draw {
  prediction_color: [u8; 3],
  truth_color: [u8; 3],
  thickness: i32,
  /// 边界框所在的参考坐标系边长
  frame: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      prediction_color: PREDICTION_COLOR,
      truth_color: TRUTH_COLOR,
      thickness: LINE_THICKNESS,
      frame: REFERENCE_FRAME,
    }
  }
}

impl Draw {
  /// 把参考坐标系中的框映射到图像上并绘制边框
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let sx = w / self.frame as f32;
    let sy = h / self.frame as f32;
    let (x1, y1, x2, y2) = bbox.to_corners();

    let x_min = ((x1 as f32 * sx).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((y1 as f32 * sy).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((x2 as f32 * sx).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((y2 as f32 * sy).ceil() as i32).clamp(0, h as i32 - 1);

    for t in 0..self.thickness {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  /// 预测框为红色，真值框为绿色
  pub fn draw_comparison(&self, frame: &Frame, sample: &DetectionSample) -> RgbImage {
    let mut image = frame.image().clone();
    self.draw_bbox(&mut image, sample.truth, self.truth_color);
    for item in sample.detections.items.iter() {
      self.draw_bbox(&mut image, &item.bbox, self.prediction_color);
    }
    image
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{DetectItem, DetectResult};

  #[test]
  fn draws_prediction_and_truth() {
    let frame = Frame::new("001", RgbImage::new(640, 640));
    let detections = DetectResult::from(vec![DetectItem {
      score: 0.9,
      bbox: BoundingBox::new(100, 100, 40, 20),
    }]);
    let truth = BoundingBox::new(400, 400, 60, 30);
    let image = Draw::default().draw_comparison(
      &frame,
      &DetectionSample {
        model_name: "m",
        detections: &detections,
        truth: &truth,
      },
    );

    assert_eq!(image.get_pixel(80, 90), &Rgb(PREDICTION_COLOR));
    assert_eq!(image.get_pixel(370, 385), &Rgb(TRUTH_COLOR));
    assert_eq!(image.get_pixel(100, 100), &Rgb([0, 0, 0]));
  }

  #[test]
  fn boxes_scale_with_image_size() {
    let frame = Frame::new("001", RgbImage::new(320, 320));
    let truth = BoundingBox::new(320, 320, 128, 128);
    let image = Draw::default().draw_comparison(
      &frame,
      &DetectionSample {
        model_name: "m",
        detections: &DetectResult::default(),
        truth: &truth,
      },
    );
    // 参考坐标 256 对应 128
    assert_eq!(image.get_pixel(128, 160), &Rgb(TRUTH_COLOR));
  }

  #[test]
  fn degenerate_box_is_ignored() {
    let frame = Frame::new("001", RgbImage::new(64, 64));
    let truth = BoundingBox::new(10, 10, 0, 0);
    let image = Draw::default().draw_comparison(
      &frame,
      &DetectionSample {
        model_name: "m",
        detections: &DetectResult::default(),
        truth: &truth,
      },
    );
    assert!(image.pixels().all(|p| p == &Rgb([0, 0, 0])));
  }
}
