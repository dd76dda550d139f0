// 该文件是 Chepai （车牌） 项目的一部分。
// src/pipeline.rs - 单张车辆图像的车牌识别流程
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

use std::fmt::Display;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::Frame,
  geometry::BoundingBox,
  label::normalize_plate,
  model::{DetectResult, Model},
  notice::{LegalNotice, LegalNoticeClient, NoticeError},
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("车牌检测失败: {0}")]
  DetectionError(String),
  #[error("图像 {0} 中没有检测到车牌")]
  NoPlate(String),
  #[error("检测框 {1:?} 不在图像 {0} 内")]
  EmptyCrop(String, BoundingBox),
  #[error("车牌识别失败: {0}")]
  RecognitionError(String),
  #[error("运输许可查询失败: {0}")]
  NoticeError(#[from] NoticeError),
}

/// 一张图像的识别结果
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
  pub image: String,
  /// 图像像素坐标
  pub bbox: BoundingBox,
  pub raw_text: String,
  pub plate: String,
  /// 未配置查询时为空
  pub notices: Vec<LegalNotice>,
}

/// 检测 → 裁剪 → 识别 → 规范化 → 查询许可
pub struct PlatePipeline<D, R> {
  detector: D,
  recognizer: R,
  notices: Option<LegalNoticeClient>,
}

impl<D, R> PlatePipeline<D, R>
where
  D: Model<Input = Frame, Output = DetectResult>,
  D::Error: Display,
  R: Model<Input = Frame, Output = String>,
  R::Error: Display,
{
  pub fn new(detector: D, recognizer: R) -> Self {
    Self {
      detector,
      recognizer,
      notices: None,
    }
  }

  pub fn with_notices(mut self, client: LegalNoticeClient) -> Self {
    self.notices = Some(client);
    self
  }

  /// 只识别车牌文本，不查询许可
  pub fn read_plate(&self, frame: &Frame) -> Result<(BoundingBox, String, String), PipelineError> {
    let detections = self
      .detector
      .infer(frame)
      .map_err(|e| PipelineError::DetectionError(e.to_string()))?;
    let bbox = detections
      .first()
      .map(|item| item.bbox)
      .ok_or_else(|| PipelineError::NoPlate(frame.name().to_string()))?;
    debug!("{} 的车牌位置: {:?}", frame.name(), bbox);

    let plate_image = frame
      .crop(&bbox)
      .ok_or_else(|| PipelineError::EmptyCrop(frame.name().to_string(), bbox))?;
    let raw_text = self
      .recognizer
      .infer(&plate_image)
      .map_err(|e| PipelineError::RecognitionError(e.to_string()))?;
    let plate = normalize_plate(&raw_text);
    info!("{} 识别出车牌: {}", frame.name(), plate);
    Ok((bbox, raw_text, plate))
  }

  pub fn run(&self, frame: &Frame) -> Result<PlateReading, PipelineError> {
    let (bbox, raw_text, plate) = self.read_plate(frame)?;
    let notices = match &self.notices {
      Some(client) if !plate.is_empty() => client.lookup(&plate)?,
      _ => Vec::new(),
    };
    Ok(PlateReading {
      image: frame.name().to_string(),
      bbox,
      raw_text,
      plate,
      notices,
    })
  }
}

#[cfg(test)]
mod tests {
  use image::RgbImage;

  use super::*;
  use crate::{FromUrl, http_stub::HttpStub, model::DetectItem};

  struct OneBox(Option<BoundingBox>);

  impl Model for OneBox {
    type Input = Frame;
    type Output = DetectResult;
    type Error = String;

    fn infer(&self, _input: &Frame) -> Result<DetectResult, String> {
      Ok(
        self
          .0
          .map(|bbox| vec![DetectItem { score: 0.9, bbox }])
          .unwrap_or_default()
          .into(),
      )
    }
  }

  /// 返回裁剪尺寸，用于确认识别模型收到的是车牌区域
  struct SizeReader;

  impl Model for SizeReader {
    type Input = Frame;
    type Output = String;
    type Error = String;

    fn infer(&self, input: &Frame) -> Result<String, String> {
      Ok(format!("b-{} x{}!", input.width(), input.height()))
    }
  }

  #[test]
  fn reads_and_normalizes_cropped_plate() {
    let pipeline = PlatePipeline::new(OneBox(Some(BoundingBox::new(50, 40, 30, 12))), SizeReader);
    let reading = pipeline
      .run(&Frame::new("002", RgbImage::new(100, 80)))
      .unwrap();
    assert_eq!(reading.raw_text, "b-30 x12!");
    assert_eq!(reading.plate, "B30X12");
    assert_eq!(reading.bbox, BoundingBox::new(50, 40, 30, 12));
    assert!(reading.notices.is_empty());
  }

  #[test]
  fn no_detection_is_reported() {
    let pipeline = PlatePipeline::new(OneBox(None), SizeReader);
    assert!(matches!(
      pipeline.run(&Frame::new("002", RgbImage::new(10, 10))),
      Err(PipelineError::NoPlate(name)) if name == "002"
    ));
  }

  #[test]
  fn box_outside_image_is_rejected() {
    let pipeline = PlatePipeline::new(OneBox(Some(BoundingBox::new(500, 500, 10, 10))), SizeReader);
    assert!(matches!(
      pipeline.run(&Frame::new("002", RgbImage::new(10, 10))),
      Err(PipelineError::EmptyCrop(..))
    ));
  }

  #[test]
  fn recognized_plate_is_looked_up() {
    let stub = HttpStub::serve(|request| match request.target.as_str() {
      "/aviz/locations?nr=B30X12" => (200, r#"{"codAviz": ["ABC123"]}"#.to_string()),
      "/aviz/ABC123" => (
        200,
        r#"{"volum": {"total": 8}, "valabilitate": {"emitere": 0, "finalizare": 0}}"#.to_string(),
      ),
      _ => (404, "{}".to_string()),
    });
    let client = LegalNoticeClient::from_url(&stub.url("/aviz")).unwrap();
    let pipeline = PlatePipeline::new(OneBox(Some(BoundingBox::new(50, 40, 30, 12))), SizeReader)
      .with_notices(client);

    let reading = pipeline
      .run(&Frame::new("002", RgbImage::new(100, 80)))
      .unwrap();
    assert_eq!(reading.plate, "B30X12");
    assert_eq!(reading.notices.len(), 1);
    assert_eq!(reading.notices[0].code, "ABC123");
    assert_eq!(reading.notices[0].volume, 8.0);
  }

  #[test]
  fn lookup_failure_is_a_pipeline_error() {
    let stub = HttpStub::serve(|_| (503, "{}".to_string()));
    let client = LegalNoticeClient::from_url(&stub.url("/aviz/")).unwrap();
    let pipeline = PlatePipeline::new(OneBox(Some(BoundingBox::new(50, 40, 30, 12))), SizeReader)
      .with_notices(client);
    assert!(matches!(
      pipeline.run(&Frame::new("002", RgbImage::new(100, 80))),
      Err(PipelineError::NoticeError(_))
    ));
  }
}
