// 该文件是 Chepai （车牌） 项目的一部分。
// src/frame.rs - 待推理的图像帧
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

use std::io::Cursor;

use image::{ImageFormat, RgbImage, imageops};

use crate::geometry::BoundingBox;

/// 一帧 RGB 图像及其名称（文件名去掉扩展名）
#[derive(Debug, Clone)]
pub struct Frame {
  name: String,
  image: RgbImage,
}

impl Frame {
  pub fn new(name: impl Into<String>, image: RgbImage) -> Self {
    Self {
      name: name.into(),
      image,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 编码为 JPEG，供远程推理接口上传
  pub fn to_jpeg(&self) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    self.image.write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
  }

  /// 按边界框裁剪，保留原名称；超出画面的部分被截掉，裁剪区域为空时返回 `None`
  pub fn crop(&self, bbox: &BoundingBox) -> Option<Frame> {
    let (x1, y1, x2, y2) = bbox.to_corners();
    let x1 = x1.clamp(0, self.width() as i32) as u32;
    let y1 = y1.clamp(0, self.height() as i32) as u32;
    let x2 = x2.clamp(0, self.width() as i32) as u32;
    let y2 = y2.clamp(0, self.height() as i32) as u32;
    if x2 <= x1 || y2 <= y1 {
      return None;
    }

    let cropped = imageops::crop_imm(&self.image, x1, y1, x2 - x1, y2 - y1).to_image();
    Some(Frame::new(self.name.clone(), cropped))
  }
}
