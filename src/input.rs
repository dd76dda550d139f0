// 该文件是 Chepai （车牌） 项目的一部分。
// src/input.rs - 评测图像目录输入
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

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::info;

use crate::frame::Frame;

const IMAGE_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum InputError {
  #[error("无法读取图像目录 {0}: {1}")]
  DirectoryError(PathBuf, std::io::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 目录中的一张待评测图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSample {
  /// 文件名去掉扩展名，用来与标注配对
  pub stem: String,
  pub path: PathBuf,
}

impl ImageSample {
  pub fn from_path(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let stem = path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    ImageSample { stem, path }
  }

  pub fn load(&self) -> Result<Frame, InputError> {
    let image = ImageReader::open(&self.path)?.decode()?.to_rgb8();
    Ok(Frame::new(self.stem.clone(), image))
  }
}

/// 列出目录中全部 `.jpg` 图像，按文件名排序
pub fn list_images(directory: impl AsRef<Path>) -> Result<Vec<ImageSample>, InputError> {
  let directory = directory.as_ref();
  let mut samples = std::fs::read_dir(directory)
    .map_err(|e| InputError::DirectoryError(directory.to_path_buf(), e))?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == IMAGE_EXTENSION))
    .map(ImageSample::from_path)
    .collect::<Vec<_>>();
  samples.sort_by(|a, b| a.path.cmp(&b.path));

  info!("图像目录 {} 中共有 {} 张图像", directory.display(), samples.len());
  Ok(samples)
}
