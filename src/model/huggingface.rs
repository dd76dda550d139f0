// 该文件是 Chepai （车牌） 项目的一部分。
// src/model/huggingface.rs - 远程图像转文本（TrOCR）识别模型
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

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, model::Model, query_param};

const INFERENCE_ENDPOINT: &str = "https://api-inference.huggingface.co/models/";
const TOKEN_ENV: &str = "HF_TOKEN";

#[derive(Error, Debug)]
pub enum HuggingFaceError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少模型名称: {0}")]
  MissingModel(String),
  #[error("无效的接口地址: {0}")]
  InvalidEndpoint(#[from] url::ParseError),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("推理服务返回错误: {0}")]
  ServiceError(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedText {
  pub generated_text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InferenceResponse {
  Generated(Vec<GeneratedText>),
  Error { error: String },
}

impl InferenceResponse {
  /// 取第一条生成文本，没有生成结果时为空字符串
  pub fn into_text(self) -> Result<String, HuggingFaceError> {
    match self {
      InferenceResponse::Generated(items) => Ok(
        items
          .into_iter()
          .next()
          .map(|g| g.generated_text)
          .unwrap_or_default(),
      ),
      InferenceResponse::Error { error } => Err(HuggingFaceError::ServiceError(error)),
    }
  }
}

/// 通过 `hf://<org>/<model>` 构建
pub struct HuggingFaceRecognizer {
  client: Client,
  endpoint: Url,
  token: Option<String>,
}

impl FromUrlWithScheme for HuggingFaceRecognizer {
  const SCHEME: &'static str = "hf";
}

impl FromUrl for HuggingFaceRecognizer {
  type Error = HuggingFaceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(HuggingFaceError::SchemeMismatch);
    }

    let org = url
      .host_str()
      .filter(|h| !h.is_empty())
      .ok_or_else(|| HuggingFaceError::MissingModel(url.to_string()))?;
    let model = url.path().trim_matches('/');
    let id = if model.is_empty() {
      org.to_string()
    } else {
      format!("{}/{}", org, model)
    };

    let base = query_param::<String>(url, "endpoint").unwrap_or_else(|| INFERENCE_ENDPOINT.into());
    let endpoint = Url::parse(&base)?.join(&id)?;

    info!("使用远程识别模型: {}", endpoint);
    Ok(HuggingFaceRecognizer {
      client: Client::new(),
      endpoint,
      token: std::env::var(TOKEN_ENV).ok(),
    })
  }
}

impl Model for HuggingFaceRecognizer {
  type Input = Frame;
  type Output = String;
  type Error = HuggingFaceError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let mut request = self
      .client
      .post(self.endpoint.clone())
      .header("Content-Type", "image/jpeg")
      .body(input.to_jpeg()?);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response: InferenceResponse = request.send()?.json()?;
    let text = response.into_text()?;
    debug!("{} 的识别结果: {:?}", input.name(), text);
    Ok(text)
  }
}
