// 该文件是 Chepai （车牌） 项目的一部分。
// src/model/hosted.rs - 远程托管的车牌检测模型
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

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  geometry::BoundingBox,
  model::{DetectItem, DetectResult, Model},
  query_param,
};

const HOSTED_ENDPOINT: &str = "https://detect.roboflow.com";
const HOSTED_API_KEY_ENV: &str = "ROBOFLOW_API_KEY";
const HOSTED_DEFAULT_VERSION: &str = "1";
const HOSTED_DEFAULT_CONFIDENCE: u32 = 50;
const HOSTED_DEFAULT_OVERLAP: u32 = 50;

#[derive(Error, Debug)]
pub enum HostedError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少项目名称: {0}")]
  MissingProject(String),
  #[error("缺少 API 密钥，请设置 ROBOFLOW_API_KEY")]
  MissingApiKey,
  #[error("无效的接口地址: {0}")]
  InvalidEndpoint(#[from] url::ParseError),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 远程接口返回的单个预测，坐标为像素单位的中心点与宽高
#[derive(Debug, Clone, Deserialize)]
pub struct HostedPrediction {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
  #[serde(default)]
  pub confidence: f64,
  #[serde(default)]
  pub class: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostedResponse {
  #[serde(default)]
  pub predictions: Vec<HostedPrediction>,
}

impl From<HostedResponse> for DetectResult {
  fn from(response: HostedResponse) -> Self {
    response
      .predictions
      .into_iter()
      .map(|p| DetectItem {
        score: p.confidence as f32,
        bbox: BoundingBox::new(p.x as i32, p.y as i32, p.width as i32, p.height as i32),
      })
      .collect::<Vec<_>>()
      .into()
  }
}

/// 通过 `roboflow://<project>/<version>?confidence=50&overlap=50` 构建
pub struct HostedDetector {
  client: Client,
  endpoint: Url,
  api_key: String,
  confidence: u32,
  overlap: u32,
}

impl FromUrlWithScheme for HostedDetector {
  const SCHEME: &'static str = "roboflow";
}

impl FromUrl for HostedDetector {
  type Error = HostedError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(HostedError::SchemeMismatch);
    }

    let project = url
      .host_str()
      .filter(|h| !h.is_empty())
      .ok_or_else(|| HostedError::MissingProject(url.to_string()))?;
    let version = match url.path().trim_matches('/') {
      "" => HOSTED_DEFAULT_VERSION,
      v => v,
    };

    let api_key = query_param::<String>(url, "api_key")
      .or_else(|| std::env::var(HOSTED_API_KEY_ENV).ok())
      .ok_or(HostedError::MissingApiKey)?;
    let base = query_param::<String>(url, "endpoint").unwrap_or_else(|| HOSTED_ENDPOINT.into());
    let endpoint = Url::parse(&base)?.join(&format!("{}/{}", project, version))?;

    info!("使用远程检测模型: {}", endpoint);
    Ok(HostedDetector {
      client: Client::new(),
      endpoint,
      api_key,
      confidence: query_param(url, "confidence").unwrap_or(HOSTED_DEFAULT_CONFIDENCE),
      overlap: query_param(url, "overlap").unwrap_or(HOSTED_DEFAULT_OVERLAP),
    })
  }
}

impl Model for HostedDetector {
  type Input = Frame;
  type Output = DetectResult;
  type Error = HostedError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let body = STANDARD.encode(input.to_jpeg()?);
    debug!("上传图像 {} ({} 字节)", input.name(), body.len());

    let response: HostedResponse = self
      .client
      .post(self.endpoint.clone())
      .query(&[
        ("api_key", self.api_key.clone()),
        ("confidence", self.confidence.to_string()),
        ("overlap", self.overlap.to_string()),
      ])
      .header("Content-Type", "application/x-www-form-urlencoded")
      .body(body)
      .send()?
      .error_for_status()?
      .json()?;

    debug!("{} 的远程预测: {:?}", input.name(), response.predictions);
    Ok(response.into())
  }
}
