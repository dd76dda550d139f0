// 该文件是 Chepai （车牌） 项目的一部分。
// src/model.rs - 模型
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, geometry::BoundingBox, url_file_path};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub score: f32,
  /// 源图像像素坐标
  pub bbox: BoundingBox,
}

/// 按模型报告顺序排列的检测结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// 第一个（得分最高或最先报告的）检测框
  pub fn first(&self) -> Option<&DetectItem> {
    self.items.first()
  }

  /// 模型给出的框以源图像像素为单位，评测前统一映射到参考画面
  pub fn to_reference_frame(&self, width: u32, height: u32) -> Self {
    self
      .items
      .iter()
      .map(|item| DetectItem {
        score: item.score,
        bbox: item.bbox.to_reference_frame(width, height),
      })
      .collect::<Vec<_>>()
      .into()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod hosted;
pub use self::hosted::{HostedDetector, HostedError};

mod huggingface;
pub use self::huggingface::{HuggingFaceError, HuggingFaceRecognizer};

mod replay;
pub use self::replay::{ReplayDetector, ReplayError, ReplayRecognizer, parse_detection_line};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxDetector, OnnxError};

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("远程检测模型错误: {0}")]
  HostedError(#[from] HostedError),
  #[error("远程识别模型错误: {0}")]
  HuggingFaceError(#[from] HuggingFaceError),
  #[error("回放模型错误: {0}")]
  ReplayError(#[from] ReplayError),
  #[cfg(feature = "onnx")]
  #[error("ONNX 模型错误: {0}")]
  OnnxError(#[from] OnnxError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 车牌检测模型，按 URL 方案选择实现
pub enum Detection {
  Hosted(HostedDetector),
  #[cfg(feature = "onnx")]
  Onnx(OnnxDetector),
  Replay(ReplayDetector),
}

impl FromUrl for Detection {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      HostedDetector::SCHEME => Ok(Detection::Hosted(HostedDetector::from_url(url)?)),
      #[cfg(feature = "onnx")]
      OnnxDetector::SCHEME => Ok(Detection::Onnx(OnnxDetector::from_url(url)?)),
      ReplayDetector::SCHEME => Ok(Detection::Replay(ReplayDetector::from_url(url)?)),
      other => Err(ModelError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Model for Detection {
  type Input = Frame;
  type Output = DetectResult;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      Detection::Hosted(model) => model.infer(input).map_err(ModelError::from),
      #[cfg(feature = "onnx")]
      Detection::Onnx(model) => model.infer(input).map_err(ModelError::from),
      Detection::Replay(model) => model.infer(input).map_err(ModelError::from),
    }
  }
}

/// 车牌文字识别模型，输出原始文本
pub enum Recognition {
  HuggingFace(HuggingFaceRecognizer),
  Replay(ReplayRecognizer),
}

impl FromUrl for Recognition {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      HuggingFaceRecognizer::SCHEME => Ok(Recognition::HuggingFace(
        HuggingFaceRecognizer::from_url(url)?,
      )),
      ReplayRecognizer::SCHEME => Ok(Recognition::Replay(ReplayRecognizer::from_url(url)?)),
      other => Err(ModelError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Model for Recognition {
  type Input = Frame;
  type Output = String;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      Recognition::HuggingFace(model) => model.infer(input).map_err(ModelError::from),
      Recognition::Replay(model) => model.infer(input).map_err(ModelError::from),
    }
  }
}

/// 一个待评测模型：显示名称、来源链接与构建用的 URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
  pub name: String,
  pub link: String,
  pub url: Url,
}

impl ModelSpec {
  pub fn new(name: impl Into<String>, link: impl Into<String>, url: Url) -> Self {
    Self {
      name: name.into(),
      link: link.into(),
      url,
    }
  }
}

/// 查询参数 `name`、`link` 优先，否则由 URL 推导
impl FromUrl for ModelSpec {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let query = |key: &str| {
      url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
    };
    let host = url.host_str().unwrap_or_default();
    let path = url.path().trim_matches('/');

    let (default_name, default_link) = match url.scheme() {
      HostedDetector::SCHEME => (
        host.to_string(),
        format!("https://universe.roboflow.com/{}", host),
      ),
      HuggingFaceRecognizer::SCHEME => {
        let id = format!("{}/{}", host, path);
        let link = format!("https://huggingface.co/{}", id);
        (id, link)
      }
      _ => {
        let stem = url_file_path(url)
          .file_stem()
          .map(|s| s.to_string_lossy().into_owned())
          .unwrap_or_else(|| url.to_string());
        (stem, url.to_string())
      }
    };

    Ok(ModelSpec {
      name: query("name").unwrap_or(default_name),
      link: query("link").unwrap_or(default_link),
      url: url.clone(),
    })
  }
}
