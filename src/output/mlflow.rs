// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/mlflow.rs - MLflow 实验记录
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

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, query_param,
  output::{SinkError, TrackingSession, TrackingSink},
};

const MLFLOW_API_PREFIX: &str = "api/2.0/mlflow/";
const MLFLOW_USERNAME_ENV: &str = "MLFLOW_TRACKING_USERNAME";
const MLFLOW_PASSWORD_ENV: &str = "MLFLOW_TRACKING_PASSWORD";
const MLFLOW_DEFAULT_EXPERIMENT: &str = "0";
const RUN_FINISHED: &str = "FINISHED";
const RUN_FAILED: &str = "FAILED";

#[derive(Error, Debug)]
pub enum MlflowError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无效的跟踪服务地址: {0}")]
  InvalidEndpoint(#[from] url::ParseError),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct CreateRun<'a> {
  experiment_id: &'a str,
  start_time: i64,
}

#[derive(Deserialize)]
struct CreateRunResponse {
  run: Run,
}

#[derive(Deserialize)]
struct Run {
  info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
  run_id: String,
}

#[derive(Serialize)]
struct Param<'a> {
  key: &'a str,
  value: &'a str,
}

#[derive(Serialize)]
struct Metric<'a> {
  key: &'a str,
  value: f64,
  timestamp: i64,
  step: i64,
}

#[derive(Serialize)]
struct LogBatch<'a> {
  run_id: &'a str,
  params: Vec<Param<'a>>,
  metrics: Vec<Metric<'a>>,
}

#[derive(Serialize)]
struct UpdateRun<'a> {
  run_id: &'a str,
  status: &'a str,
  end_time: i64,
}

/// 通过 `mlflow+https://host/path?experiment_id=0` 构建，每个会话对应一次 run
pub struct MlflowSink {
  client: Client,
  base: Url,
  experiment_id: String,
  credentials: Option<(String, String)>,
}

impl FromUrlWithScheme for MlflowSink {
  const SCHEME: &'static str = "mlflow";
}

impl FromUrl for MlflowSink {
  type Error = MlflowError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let transport = match url.scheme().split_once('+') {
      Some((Self::SCHEME, transport)) => transport,
      None if url.scheme() == Self::SCHEME => "https",
      _ => return Err(MlflowError::SchemeMismatch),
    };

    let mut base = url.clone();
    base.set_query(None);
    // 切片从 `:` 开始，只替换方案名
    let base = format!("{}{}", transport, &base[url::Position::AfterScheme..]);
    let mut base = Url::parse(&base)?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let credentials = match (
      std::env::var(MLFLOW_USERNAME_ENV),
      std::env::var(MLFLOW_PASSWORD_ENV),
    ) {
      (Ok(user), Ok(password)) => Some((user, password)),
      _ => None,
    };

    info!("使用 MLflow 跟踪服务: {}", base);
    Ok(MlflowSink {
      client: Client::new(),
      base,
      experiment_id: query_param(url, "experiment_id")
        .unwrap_or_else(|| MLFLOW_DEFAULT_EXPERIMENT.to_string()),
      credentials,
    })
  }
}

impl MlflowSink {
  fn endpoint(&self, method: &str) -> Result<Url, MlflowError> {
    Ok(self.base.join(MLFLOW_API_PREFIX)?.join(method)?)
  }

  fn post<T: Serialize>(&self, method: &str, body: &T) -> Result<RequestBuilder, MlflowError> {
    let mut request = self.client.post(self.endpoint(method)?).json(body);
    if let Some((user, password)) = &self.credentials {
      request = request.basic_auth(user, Some(password));
    }
    Ok(request)
  }

  fn update(&self, run_id: &str, status: &str) -> Result<(), MlflowError> {
    self
      .post(
        "runs/update",
        &UpdateRun {
          run_id,
          status,
          end_time: Utc::now().timestamp_millis(),
        },
      )?
      .send()?
      .error_for_status()?;
    Ok(())
  }

  fn log_batch(&self, run_id: &str, session: &TrackingSession, now: i64) -> Result<(), MlflowError> {
    let batch = LogBatch {
      run_id,
      params: session
        .params
        .iter()
        .map(|(key, value)| Param { key, value })
        .collect(),
      metrics: session
        .metrics
        .iter()
        .map(|(key, value)| Metric {
          key,
          value: *value,
          timestamp: now,
          step: 0,
        })
        .collect(),
    };
    self
      .post("runs/log-batch", &batch)?
      .send()?
      .error_for_status()?;
    Ok(())
  }

  fn record(&self, session: &TrackingSession) -> Result<String, MlflowError> {
    let now = Utc::now().timestamp_millis();
    let created: CreateRunResponse = self
      .post(
        "runs/create",
        &CreateRun {
          experiment_id: &self.experiment_id,
          start_time: now,
        },
      )?
      .send()?
      .error_for_status()?
      .json()?;
    let run_id = created.run.info.run_id;
    debug!("创建 MLflow run: {}", run_id);

    if let Err(e) = self.log_batch(&run_id, session, now) {
      // 尽力把 run 标记为失败，原错误优先返回
      if let Err(update) = self.update(&run_id, RUN_FAILED) {
        warn!("无法将 run {} 标记为失败: {}", run_id, update);
      }
      return Err(e);
    }

    self.update(&run_id, RUN_FINISHED)?;
    Ok(run_id)
  }
}

impl TrackingSink for MlflowSink {
  fn log_session(&self, session: &TrackingSession) -> Result<(), SinkError> {
    let run_id = self.record(session)?;
    info!("实验记录已上传: run {}", run_id);
    Ok(())
  }
}
