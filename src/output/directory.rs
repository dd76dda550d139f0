// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/directory.rs - 按模型分目录保存评测输出
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

use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

#[cfg(feature = "visualize")]
use crate::output::draw::Draw;
use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::{DetectionSample, OutputError, Record, Render},
  url_file_path,
};

enum DrawWrapper {
  #[cfg(feature = "visualize")]
  Draw(Draw),
  Record(Record),
}

impl DrawWrapper {
  fn save_result(
    &self,
    path: &Path,
    frame: &Frame,
    sample: &DetectionSample,
  ) -> Result<(), OutputError> {
    match self {
      #[cfg(feature = "visualize")]
      DrawWrapper::Draw(draw) => {
        draw.draw_comparison(frame, sample).save(path)?;
      }
      DrawWrapper::Record(record) => {
        frame.image().save(path)?;
        record.record(sample.detections, path)?;
      }
    }
    Ok(())
  }
}

/// `folder:///out` 绘制预测与真值对比图，`folder:///out?record` 写出回放记录
///
/// 每个模型的输出放在以模型名命名的子目录中。
pub struct DirectoryOutput {
  directory: PathBuf,
  draw: DrawWrapper,
}

impl FromUrlWithScheme for DirectoryOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(url.scheme().to_string()));
    }

    let draw = if url.query_pairs().any(|(k, _)| k == "record") {
      DrawWrapper::Record(Record::default())
    } else {
      Self::draw_wrapper(url)?
    };

    Ok(DirectoryOutput {
      directory: url_file_path(url),
      draw,
    })
  }
}

impl DirectoryOutput {
  #[cfg(feature = "visualize")]
  fn draw_wrapper(_url: &Url) -> Result<DrawWrapper, OutputError> {
    Ok(DrawWrapper::Draw(Draw::default()))
  }

  #[cfg(not(feature = "visualize"))]
  fn draw_wrapper(url: &Url) -> Result<DrawWrapper, OutputError> {
    Err(OutputError::VisualizeDisabled(url.to_string()))
  }

  /// 模型名中的 `/` 等字符替换为 `_`
  fn model_directory(&self, model_name: &str) -> PathBuf {
    let name = model_name
      .chars()
      .map(|c| {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect::<String>();
    self.directory.join(name)
  }
}

impl<'a> Render<Frame, DetectionSample<'a>> for DirectoryOutput {
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, sample: &DetectionSample<'a>) -> Result<(), Self::Error> {
    let directory = self.model_directory(sample.model_name);
    std::fs::create_dir_all(&directory)?;
    let path = directory.join(format!("{}.png", frame.name()));
    self.draw.save_result(&path, frame, sample)?;
    debug!("保存评测输出: {}", path.display());
    Ok(())
  }
}
