// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/record.rs - 预测结果记录
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

use std::path::Path;

use crate::{geometry::REFERENCE_FRAME, model::DetectResult};

/// 车牌只有一个类别
const PLATE_CLASS_ID: u32 = 0;

/// 以回放模型可读的格式写出检测结果，每行 `class x y w h score`
#[derive(Debug, Clone)]
pub struct Record {
  pub frame: u32,
}

impl Default for Record {
  fn default() -> Self {
    Record {
      frame: REFERENCE_FRAME,
    }
  }
}

impl Record {
  pub fn format(&self, result: &DetectResult) -> String {
    let frame = f64::from(self.frame);
    result
      .items
      .iter()
      .map(|item| {
        let b = item.bbox;
        format!(
          "{} {} {} {} {} {:.4}",
          PLATE_CLASS_ID,
          f64::from(b.center_x) / frame,
          f64::from(b.center_y) / frame,
          f64::from(b.width) / frame,
          f64::from(b.height) / frame,
          item.score
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn record(&self, result: &DetectResult, path: &Path) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), self.format(result))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    geometry::BoundingBox,
    model::{DetectItem, parse_detection_line},
  };

  #[test]
  fn records_are_readable_by_replay() {
    let result = DetectResult::from(vec![
      DetectItem {
        score: 0.9,
        bbox: BoundingBox::new(320, 320, 128, 64),
      },
      DetectItem {
        score: 0.5,
        bbox: BoundingBox::new(160, 480, 32, 16),
      },
    ]);
    let text = Record::default().format(&result);
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "0 0.5 0.5 0.2 0.1 0.9000");

    let item = parse_detection_line(lines[1], (REFERENCE_FRAME, REFERENCE_FRAME)).unwrap();
    assert_eq!(item.bbox, BoundingBox::new(160, 480, 32, 16));
    assert!((item.score - 0.5).abs() < 1e-6);
  }

  #[test]
  fn no_detection_writes_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.png");
    Record::default()
      .record(&DetectResult::default(), &path)
      .unwrap();
    assert_eq!(std::fs::read_to_string(dir.path().join("001.txt")).unwrap(), "");
  }
}
