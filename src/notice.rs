// 该文件是 Chepai （车牌） 项目的一部分。
// src/notice.rs - 木材运输许可查询
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

//! 按车牌号查询车辆名下的运输许可（aviz）。
//!
//! 先通过 `locations?nr=<车牌>` 取得许可编号列表，再逐个读取许可详情。

use std::{fmt, time::Duration};

use chrono::DateTime;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::FromUrl;

pub const NOTICE_ENDPOINT: &str = "https://inspectorulpadurii.ro/api/aviz/";
const NOTICE_TIMEOUT: Duration = Duration::from_secs(10);
/// 接口时间戳为 UTC 毫秒，显示时固定加两小时
const NOTICE_UTC_OFFSET_MS: i64 = 2 * 60 * 60 * 1000;
const NOTICE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Error, Debug)]
pub enum NoticeError {
  #[error("不支持的接口地址: {0}")]
  UnsupportedEndpoint(String),
  #[error("无效的接口地址: {0}")]
  InvalidEndpoint(#[from] url::ParseError),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("无效的时间戳: {0}")]
  InvalidTimestamp(i64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationsResponse {
  #[serde(rename = "codAviz", default)]
  pub codes: Vec<serde_json::Value>,
}

impl LocationsResponse {
  /// 许可编号可能是字符串或数字
  pub fn code_strings(&self) -> Vec<String> {
    self
      .codes
      .iter()
      .map(|code| match code {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
      })
      .collect()
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
  pub total: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Validity {
  pub emitere: i64,
  pub finalizare: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoticeResponse {
  pub volum: Volume,
  pub valabilitate: Validity,
}

/// 一条运输许可
#[derive(Debug, Clone, PartialEq)]
pub struct LegalNotice {
  pub code: String,
  pub volume: f64,
  pub valid_from: String,
  pub valid_to: String,
}

impl LegalNotice {
  pub fn from_response(code: String, response: &NoticeResponse) -> Result<Self, NoticeError> {
    Ok(LegalNotice {
      code,
      volume: response.volum.total,
      valid_from: format_timestamp(response.valabilitate.emitere)?,
      valid_to: format_timestamp(response.valabilitate.finalizare)?,
    })
  }
}

impl fmt::Display for LegalNotice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Code: {}, Volume: {}, Validity: {} - {}",
      self.code, self.volume, self.valid_from, self.valid_to
    )
  }
}

/// 毫秒时间戳加两小时后格式化为 `DD/MM/YYYY HH:MM:SS`
pub fn format_timestamp(millis: i64) -> Result<String, NoticeError> {
  let shifted = millis
    .checked_add(NOTICE_UTC_OFFSET_MS)
    .ok_or(NoticeError::InvalidTimestamp(millis))?;
  let time = DateTime::from_timestamp_millis(shifted).ok_or(NoticeError::InvalidTimestamp(millis))?;
  Ok(time.format(NOTICE_TIME_FORMAT).to_string())
}

/// 通过 `https://inspectorulpadurii.ro/api/aviz` 构建
pub struct LegalNoticeClient {
  client: Client,
  base: Url,
}

impl FromUrl for LegalNoticeClient {
  type Error = NoticeError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !matches!(url.scheme(), "http" | "https") {
      return Err(NoticeError::UnsupportedEndpoint(url.to_string()));
    }

    let mut base = url.clone();
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let client = Client::builder().timeout(NOTICE_TIMEOUT).build()?;
    Ok(LegalNoticeClient { client, base })
  }
}

impl LegalNoticeClient {
  pub fn with_default_endpoint() -> Result<Self, NoticeError> {
    Self::from_url(&Url::parse(NOTICE_ENDPOINT)?)
  }

  fn locations_url(&self, plate: &str) -> Result<Url, NoticeError> {
    Ok(
      self
        .base
        .join(&format!("locations?nr={}", urlencoding::encode(plate)))?,
    )
  }

  fn notice_url(&self, code: &str) -> Result<Url, NoticeError> {
    Ok(self.base.join(&urlencoding::encode(code))?)
  }

  /// 查询车牌名下的全部许可，没有许可时返回空列表
  pub fn lookup(&self, plate: &str) -> Result<Vec<LegalNotice>, NoticeError> {
    let locations: LocationsResponse = self
      .client
      .get(self.locations_url(plate)?)
      .send()?
      .error_for_status()?
      .json()?;

    let codes = locations.code_strings();
    if codes.is_empty() {
      info!("车牌 {} 没有找到运输许可", plate);
      return Ok(Vec::new());
    }
    debug!("车牌 {} 的许可编号: {:?}", plate, codes);

    let mut notices = Vec::with_capacity(codes.len());
    for code in codes {
      let response: NoticeResponse = self
        .client
        .get(self.notice_url(&code)?)
        .send()?
        .error_for_status()?
        .json()?;
      notices.push(LegalNotice::from_response(code, &response)?);
    }
    Ok(notices)
  }
}
