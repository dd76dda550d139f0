// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/jsonl.rs - 追加写入 JSON Lines 文件的实验记录
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

use std::{
  collections::BTreeMap,
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{SinkError, TrackingSession, TrackingSink},
  url_file_path,
};

#[derive(Serialize)]
struct Line<'a> {
  timestamp: String,
  params: BTreeMap<&'a str, &'a str>,
  metrics: BTreeMap<&'a str, f64>,
}

/// 通过 `jsonl:///path/to/runs.jsonl` 构建，每个会话写一行
pub struct JsonlSink {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonlSink {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonlSink {
  type Error = SinkError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SinkError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(JsonlSink {
      path: url_file_path(url),
    })
  }
}

impl JsonlSink {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl TrackingSink for JsonlSink {
  fn log_session(&self, session: &TrackingSession) -> Result<(), SinkError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let line = Line {
      timestamp: Utc::now().to_rfc3339(),
      params: session
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect(),
      metrics: session
        .metrics
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect(),
    };

    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?;
    writeln!(file, "{}", serde_json::to_string(&line)?)?;
    debug!("实验记录已写入 {}", self.path.display());
    Ok(())
  }
}
