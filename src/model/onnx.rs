// 该文件是 Chepai （车牌） 项目的一部分。
// src/model/onnx.rs - 本地 ONNX 车牌检测模型
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

use std::sync::Mutex;

use image::{RgbImage, imageops};
use ndarray::Array4;
use ort::{session::Session, value::TensorRef};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  geometry::{BoundingBox, centered_iou},
  model::{DetectItem, DetectResult, Model},
  query_param, url_file_path,
};

const ONNX_INPUT_SIZE: u32 = 640;
const ONNX_DEFAULT_CONFIDENCE: f32 = 0.4;
const ONNX_DEFAULT_IOU: f32 = 0.45;
const ONNX_BOX_FEATURES: usize = 4;

#[derive(Error, Debug)]
pub enum OnnxError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("推理错误: {0}")]
  InferenceError(String),
  #[error("模型输出形状无效: {0:?}")]
  InvalidOutput(Vec<i64>),
}

impl From<ort::Error> for OnnxError {
  fn from(err: ort::Error) -> Self {
    OnnxError::InferenceError(err.to_string())
  }
}

/// 在原图坐标系中的候选框 (x1, y1, x2, y2)
#[derive(Debug, Clone, Copy)]
struct Candidate {
  corners: [f32; 4],
  score: f32,
}

impl Candidate {
  fn to_item(self) -> DetectItem {
    let [x1, y1, x2, y2] = self.corners;
    DetectItem {
      score: self.score,
      bbox: BoundingBox::from_corners(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
    }
  }
}

/// YOLOv8 形式导出的单类车牌检测模型
///
/// 通过 `onnx:///path/to/model.onnx?confidence=0.4&iou=0.45` 构建。
pub struct OnnxDetector {
  session: Mutex<Session>,
  confidence: f32,
  iou: f32,
}

impl FromUrlWithScheme for OnnxDetector {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxDetector {
  type Error = OnnxError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxError::SchemeMismatch);
    }

    let model_path = url_file_path(url);
    info!("加载模型文件: {}", model_path.display());
    let session = Session::builder()
      .map_err(|e| OnnxError::ModelLoadError(e.to_string()))?
      .commit_from_file(&model_path)
      .map_err(|e| OnnxError::ModelLoadError(e.to_string()))?;
    info!("模型加载完成");

    Ok(OnnxDetector {
      session: Mutex::new(session),
      confidence: query_param(url, "confidence").unwrap_or(ONNX_DEFAULT_CONFIDENCE),
      iou: query_param(url, "iou").unwrap_or(ONNX_DEFAULT_IOU),
    })
  }
}

impl OnnxDetector {
  fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(
      image,
      ONNX_INPUT_SIZE,
      ONNX_INPUT_SIZE,
      imageops::FilterType::Triangle,
    );

    let size = ONNX_INPUT_SIZE as usize;
    let mut input = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
      for c in 0..3 {
        input[[0, c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
      }
    }
    input
  }

  /// 输出布局为 `[1, 4 + classes, anchors]`，框为输入尺寸下的中心点与宽高
  fn postprocess(
    &self,
    shape: &[i64],
    data: &[f32],
    scale_x: f32,
    scale_y: f32,
  ) -> Result<Vec<Candidate>, OnnxError> {
    let [_, features, anchors] = shape[..] else {
      return Err(OnnxError::InvalidOutput(shape.to_vec()));
    };
    let (features, anchors) = (features as usize, anchors as usize);
    if features <= ONNX_BOX_FEATURES || data.len() < features * anchors {
      return Err(OnnxError::InvalidOutput(shape.to_vec()));
    }

    let feature = |f: usize, a: usize| data[f * anchors + a];
    let mut candidates = Vec::new();
    for a in 0..anchors {
      let score = (ONNX_BOX_FEATURES..features)
        .map(|f| feature(f, a))
        .fold(f32::MIN, f32::max);
      if score < self.confidence {
        continue;
      }

      let (cx, cy) = (feature(0, a), feature(1, a));
      let (w, h) = (feature(2, a), feature(3, a));
      candidates.push(Candidate {
        corners: [
          (cx - w / 2.0) * scale_x,
          (cy - h / 2.0) * scale_y,
          (cx + w / 2.0) * scale_x,
          (cy + h / 2.0) * scale_y,
        ],
        score,
      });
    }

    debug!("NMS 前候选框数量: {}", candidates.len());
    Ok(nms(candidates, self.iou))
  }
}

/// 非极大值抑制，结果按置信度降序排列
fn nms(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result = Vec::new();
  while !candidates.is_empty() {
    let best = candidates.remove(0);
    let best_box = best.to_item().bbox;
    candidates.retain(|c| centered_iou(&best_box, &c.to_item().bbox) < f64::from(threshold));
    result.push(best);
  }
  result
}

impl Model for OnnxDetector {
  type Input = Frame;
  type Output = DetectResult;
  type Error = OnnxError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let tensor = Self::preprocess(input.image());
    let scale_x = input.width() as f32 / ONNX_INPUT_SIZE as f32;
    let scale_y = input.height() as f32 / ONNX_INPUT_SIZE as f32;

    let mut session = self.session.lock().map_err(|e| {
      error!("ONNX 会话锁已损坏: {}", e);
      OnnxError::InferenceError(e.to_string())
    })?;
    let outputs = session.run(ort::inputs![TensorRef::from_array_view(tensor.view())?])?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let candidates = self.postprocess(shape.as_ref(), data, scale_x, scale_y)?;

    debug!("{} 检测到 {} 个车牌", input.name(), candidates.len());
    Ok(
      candidates
        .into_iter()
        .map(Candidate::to_item)
        .collect::<Vec<_>>()
        .into(),
    )
  }
}
