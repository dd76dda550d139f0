// 该文件是 Chepai （车牌） 项目的一部分。
// src/model/replay.rs - 回放离线记录的预测结果
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

//! 回放模型从目录中读取 `<图像名>.txt`，让一次推理的结果可以离线重复评测。
//!
//! 检测记录每行一个框：`class x y w h [score]`，坐标为归一化值，
//! 回放时按输入图像的尺寸换算为像素；
//! 文件缺失或为空表示没有检测到车牌。
//! 识别记录的第一行即为识别出的文本，文件缺失视为识别失败。

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  geometry::BoundingBox,
  model::{DetectItem, DetectResult, Model},
  url_file_path,
};

const REPLAY_SCHEME: &str = "replay";

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("回放目录不存在: {0}")]
  MissingDirectory(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录格式错误 {0}: {1}")]
  Malformed(PathBuf, String),
}

fn replay_directory(url: &Url) -> Result<PathBuf, ReplayError> {
  if url.scheme() != REPLAY_SCHEME {
    return Err(ReplayError::SchemeMismatch);
  }
  let directory = url_file_path(url);
  if !directory.is_dir() {
    return Err(ReplayError::MissingDirectory(directory));
  }
  Ok(directory)
}

/// 解析一行检测记录，归一化坐标按 `size` (宽, 高) 换算为像素
pub fn parse_detection_line(line: &str, size: (u32, u32)) -> Option<DetectItem> {
  let values = line
    .split_whitespace()
    .skip(1)
    .map(str::parse::<f64>)
    .collect::<Result<Vec<_>, _>>()
    .ok()?;
  let (x, y, w, h, score) = match values[..] {
    [x, y, w, h] => (x, y, w, h, 1.0),
    [x, y, w, h, score] => (x, y, w, h, score),
    _ => return None,
  };
  Some(DetectItem {
    score: score as f32,
    bbox: BoundingBox::from_normalized_in(x, y, w, h, size),
  })
}

/// 通过 `replay:///path/to/predictions` 构建
pub struct ReplayDetector {
  directory: PathBuf,
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = REPLAY_SCHEME;
}

impl FromUrl for ReplayDetector {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let directory = replay_directory(url)?;
    info!("回放检测记录: {}", directory.display());
    Ok(ReplayDetector { directory })
  }
}

impl Model for ReplayDetector {
  type Input = Frame;
  type Output = DetectResult;
  type Error = ReplayError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let path = self.directory.join(format!("{}.txt", input.name()));
    if !path.exists() {
      debug!("没有 {} 的检测记录", input.name());
      return Ok(DetectResult::default());
    }

    let size = (input.width(), input.height());
    let content = std::fs::read_to_string(&path)?;
    content
      .lines()
      .filter(|l| !l.trim().is_empty())
      .map(|l| {
        parse_detection_line(l, size)
          .ok_or_else(|| ReplayError::Malformed(path.clone(), l.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()
      .map(DetectResult::from)
  }
}

/// 通过 `replay:///path/to/texts` 构建
pub struct ReplayRecognizer {
  directory: PathBuf,
}

impl FromUrlWithScheme for ReplayRecognizer {
  const SCHEME: &'static str = REPLAY_SCHEME;
}

impl FromUrl for ReplayRecognizer {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let directory = replay_directory(url)?;
    info!("回放识别记录: {}", directory.display());
    Ok(ReplayRecognizer { directory })
  }
}

impl Model for ReplayRecognizer {
  type Input = Frame;
  type Output = String;
  type Error = ReplayError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let path = self.directory.join(format!("{}.txt", input.name()));
    let content = std::fs::read_to_string(&path)?;
    Ok(content.lines().next().unwrap_or_default().to_string())
  }
}
