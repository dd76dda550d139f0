// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/sink.rs - 实验记录
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

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{JsonlSink, MlflowError, MlflowSink},
};

#[derive(Error, Debug)]
pub enum SinkError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("MLflow 错误: {0}")]
  MlflowError(#[from] MlflowError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 一次实验记录：一组参数与一组指标，按加入顺序保存
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackingSession {
  pub params: Vec<(String, String)>,
  pub metrics: Vec<(String, f64)>,
}

impl TrackingSession {
  pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.params.push((key.into(), value.into()));
    self
  }

  pub fn metric(mut self, key: impl Into<String>, value: f64) -> Self {
    self.metrics.push((key.into(), value));
    self
  }
}

pub trait TrackingSink {
  fn log_session(&self, session: &TrackingSession) -> Result<(), SinkError>;
}

/// 按 URL 方案选择实验记录方式；`none:` 丢弃全部记录
pub enum SinkWrapper {
  Mlflow(MlflowSink),
  Jsonl(JsonlSink),
  Discard,
}

const DISCARD_SCHEME: &str = "none";

impl FromUrl for SinkWrapper {
  type Error = SinkError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      s if s.starts_with(MlflowSink::SCHEME) => Ok(SinkWrapper::Mlflow(MlflowSink::from_url(url)?)),
      JsonlSink::SCHEME => Ok(SinkWrapper::Jsonl(JsonlSink::from_url(url)?)),
      DISCARD_SCHEME => Ok(SinkWrapper::Discard),
      other => Err(SinkError::SchemeMismatch(other.to_string())),
    }
  }
}

impl TrackingSink for SinkWrapper {
  fn log_session(&self, session: &TrackingSession) -> Result<(), SinkError> {
    match self {
      SinkWrapper::Mlflow(sink) => sink.log_session(session),
      SinkWrapper::Jsonl(sink) => sink.log_session(session),
      SinkWrapper::Discard => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selects_sink_by_scheme() {
    let url = Url::parse("none:").unwrap();
    assert!(matches!(SinkWrapper::from_url(&url), Ok(SinkWrapper::Discard)));

    let url = Url::parse("jsonl:///tmp/runs.jsonl").unwrap();
    assert!(matches!(SinkWrapper::from_url(&url), Ok(SinkWrapper::Jsonl(_))));

    let url = Url::parse("mlflow+https://dagshub.com/org/repo.mlflow").unwrap();
    assert!(matches!(SinkWrapper::from_url(&url), Ok(SinkWrapper::Mlflow(_))));

    let url = Url::parse("ftp://example.com").unwrap();
    assert!(matches!(
      SinkWrapper::from_url(&url),
      Err(SinkError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn session_keeps_insertion_order() {
    let session = TrackingSession::default()
      .param("Project Name", "anpr-ublyc")
      .metric("IoU performance", 0.5)
      .metric("Time", 1.0);
    assert_eq!(session.params[0].0, "Project Name");
    assert_eq!(session.metrics[1], ("Time".to_string(), 1.0));
  }

  #[test]
  fn discard_always_succeeds() {
    assert!(SinkWrapper::Discard
      .log_session(&TrackingSession::default())
      .is_ok());
  }
}
