// 该文件是 Chepai （车牌） 项目的一部分。
// src/output.rs - 评测输出定义
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

use thiserror::Error;

use crate::{geometry::BoundingBox, model::DetectResult};

pub trait Render<Frame, Output> {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 一张图像的检测结果与真值，交给输出端保存
#[derive(Debug, Clone, Copy)]
pub struct DetectionSample<'a> {
  pub model_name: &'a str,
  /// 与真值框同在参考画面坐标系中
  pub detections: &'a DetectResult,
  pub truth: &'a BoundingBox,
}

#[cfg(feature = "visualize")]
pub mod draw;

mod record;
pub use self::record::Record;

mod directory;
pub use self::directory::DirectoryOutput;

mod sink;
pub use self::sink::{SinkError, SinkWrapper, TrackingSession, TrackingSink};

mod mlflow;
pub use self::mlflow::{MlflowError, MlflowSink};

mod jsonl;
pub use self::jsonl::JsonlSink;

mod reporter;
pub use self::reporter::{Reporter, detection_session, detection_summary, ocr_session, ocr_summary};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未启用可视化功能，无法绘制: {0}")]
  VisualizeDisabled(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}
