// 该文件是 Chepai （车牌） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod catalog;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod label;
pub mod model;
pub mod notice;
pub mod output;
pub mod pipeline;
pub mod task;

#[cfg(test)]
mod http_stub;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// URL 路径部分解码为本地路径，`%20` 等转义还原为原字符
pub(crate) fn url_file_path(url: &url::Url) -> std::path::PathBuf {
  match urlencoding::decode(url.path()) {
    Ok(path) => std::path::PathBuf::from(path.into_owned()),
    Err(_) => std::path::PathBuf::from(url.path()),
  }
}

/// 读取 URL 查询参数并解析，缺省或无法解析时返回 `None`
pub(crate) fn query_param<T: std::str::FromStr>(url: &url::Url, key: &str) -> Option<T> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .and_then(|(_, v)| v.parse().ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_paths_are_percent_decoded() {
    let url = url::Url::parse("replay:///data/License Plate Data/labels").unwrap();
    assert_eq!(url.path(), "/data/License%20Plate%20Data/labels");
    assert_eq!(
      url_file_path(&url),
      std::path::PathBuf::from("/data/License Plate Data/labels")
    );
  }

  #[test]
  fn query_params_parse_or_fall_back() {
    let url = url::Url::parse("onnx:///m.onnx?confidence=0.4&iou=x").unwrap();
    assert_eq!(query_param::<f32>(&url, "confidence"), Some(0.4));
    assert_eq!(query_param::<f32>(&url, "iou"), None);
    assert_eq!(query_param::<f32>(&url, "absent"), None);
  }
}
