// 该文件是 Chepai （车牌） 项目的一部分。
// src/label.rs - 真值标注读取与车牌文本规范化
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
  collections::HashMap,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geometry::{BoundingBox, REFERENCE_FRAME};

const LABEL_EXTENSION: &str = "txt";
const OCR_ID_WIDTH: usize = 3;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标注目录 {0}: {1}")]
  DirectoryError(PathBuf, std::io::Error),
  #[error("无法读取标注文件 {0}: {1}")]
  FileError(PathBuf, std::io::Error),
  #[error("标注行格式错误: {0}")]
  Malformed(String),
}

/// 去掉 `[A-Za-z0-9]` 以外的字符并转为大写
pub fn normalize_plate(text: &str) -> String {
  text
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_uppercase())
    .collect()
}

/// 裁剪车牌图像对应的标注文件名：数字编号左侧补零到 3 位
pub fn ocr_label_name(stem: &str) -> String {
  format!("{:0>width$}.{}", stem, LABEL_EXTENSION, width = OCR_ID_WIDTH)
}

/// 单个标注文件的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
  pub boxes: Vec<BoundingBox>,
  /// 第二行的原始车牌文本
  pub raw_plate: Option<String>,
}

/// 解析 YOLO 标注：第一行 `class x y w h`（归一化），可选的第二行为车牌文本
pub fn parse_label(content: &str, frame: u32) -> Result<LabelRecord, LabelError> {
  let mut lines = content.lines();
  let Some(first) = lines.next().filter(|l| !l.trim().is_empty()) else {
    return Ok(LabelRecord {
      boxes: Vec::new(),
      raw_plate: None,
    });
  };

  let fields = first
    .split_whitespace()
    .skip(1)
    .map(|v| {
      v.parse::<f64>()
        .map_err(|_| LabelError::Malformed(first.to_string()))
    })
    .collect::<Result<Vec<_>, _>>()?;
  let [x, y, w, h] = fields[..] else {
    return Err(LabelError::Malformed(first.to_string()));
  };

  let raw_plate = lines
    .next()
    .map(|l| l.trim().to_string())
    .filter(|l| !l.is_empty());

  Ok(LabelRecord {
    boxes: vec![BoundingBox::from_normalized(x, y, w, h, frame)],
    raw_plate,
  })
}

/// 一张图像的真值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruthEntry {
  pub stem: String,
  pub boxes: Vec<BoundingBox>,
  /// 已规范化的车牌文本
  pub plate: Option<String>,
}

impl GroundTruthEntry {
  pub fn label_name(&self) -> String {
    format!("{}.{}", self.stem, LABEL_EXTENSION)
  }

  /// 只使用第一个框
  pub fn primary_box(&self) -> Option<&BoundingBox> {
    self.boxes.first()
  }
}

/// 一次评测运行的全部真值，加载后不再修改
#[derive(Debug, Clone, Default)]
pub struct GroundTruthSet {
  entries: Vec<GroundTruthEntry>,
  by_stem: HashMap<String, usize>,
}

impl GroundTruthSet {
  /// 按文件名排序读取目录中的全部 `.txt` 标注
  pub fn load(directory: impl AsRef<Path>) -> Result<Self, LabelError> {
    Self::load_with_frame(directory, REFERENCE_FRAME)
  }

  pub fn load_with_frame(directory: impl AsRef<Path>, frame: u32) -> Result<Self, LabelError> {
    let directory = directory.as_ref();
    info!("读取真值标注目录: {}", directory.display());

    let mut paths = std::fs::read_dir(directory)
      .map_err(|e| LabelError::DirectoryError(directory.to_path_buf(), e))?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == LABEL_EXTENSION))
      .collect::<Vec<_>>();
    paths.sort();

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
      let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        continue;
      };
      let content =
        std::fs::read_to_string(&path).map_err(|e| LabelError::FileError(path.clone(), e))?;

      let record = match parse_label(&content, frame) {
        Ok(record) => record,
        Err(e) => {
          warn!("跳过无法解析的标注 {}: {}", path.display(), e);
          LabelRecord {
            boxes: Vec::new(),
            raw_plate: None,
          }
        }
      };
      if record.boxes.is_empty() {
        warn!("标注文件没有边界框: {}", path.display());
      }
      debug!("标注 {}: {:?}", stem, record);

      entries.push(GroundTruthEntry {
        stem,
        boxes: record.boxes,
        plate: record.raw_plate.as_deref().map(normalize_plate),
      });
    }

    info!("共读取 {} 个标注", entries.len());
    Ok(Self::from_entries(entries))
  }

  /// 条目会按图像名排序
  pub fn from_entries(mut entries: Vec<GroundTruthEntry>) -> Self {
    entries.sort_by(|a, b| a.stem.cmp(&b.stem));
    let by_stem = entries
      .iter()
      .enumerate()
      .map(|(i, e)| (e.stem.clone(), i))
      .collect();
    Self { entries, by_stem }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entries(&self) -> &[GroundTruthEntry] {
    &self.entries
  }

  /// 按排序后的位置查找
  pub fn by_index(&self, index: usize) -> Option<&GroundTruthEntry> {
    self.entries.get(index)
  }

  pub fn by_stem(&self, stem: &str) -> Option<&GroundTruthEntry> {
    self.by_stem.get(stem).map(|&i| &self.entries[i])
  }

  /// 按标注文件名（如 `001.txt`）查找车牌文本
  pub fn plate(&self, label_name: &str) -> Option<&str> {
    let stem = label_name
      .strip_suffix(LABEL_EXTENSION)
      .and_then(|s| s.strip_suffix('.'))?;
    self.by_stem(stem).and_then(|e| e.plate.as_deref())
  }

  /// 带车牌文本的条目数
  pub fn plate_count(&self) -> usize {
    self.entries.iter().filter(|e| e.plate.is_some()).count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_strips_and_uppercases() {
    assert_eq!(normalize_plate("b-20 xyz!"), "B20XYZ");
    assert_eq!(normalize_plate(""), "");
    assert_eq!(normalize_plate("ß-ab 1"), "AB1");
  }

  #[test]
  fn ocr_label_name_pads_to_three_digits() {
    assert_eq!(ocr_label_name("7"), "007.txt");
    assert_eq!(ocr_label_name("42"), "042.txt");
    assert_eq!(ocr_label_name("0123"), "0123.txt");
  }

  #[test]
  fn parse_label_with_plate() {
    let record = parse_label("0 0.5 0.5 0.2 0.2\nSB 40 DAP\n", 640).unwrap();
    assert_eq!(record.boxes, vec![BoundingBox::new(320, 320, 128, 128)]);
    assert_eq!(record.raw_plate.as_deref(), Some("SB 40 DAP"));
  }

  #[test]
  fn parse_empty_label() {
    let record = parse_label("", 640).unwrap();
    assert!(record.boxes.is_empty());
    assert!(record.raw_plate.is_none());
  }

  #[test]
  fn parse_malformed_label() {
    assert!(parse_label("0 0.5 0.5\n", 640).is_err());
    assert!(parse_label("0 a b c d\n", 640).is_err());
  }

  #[test]
  fn load_directory_sorted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("002.txt"), "0 0.25 0.25 0.1 0.1\nCJ 11 ABC").unwrap();
    std::fs::write(dir.path().join("001.txt"), "0 0.5 0.5 0.2 0.2\nSB40DAP").unwrap();
    std::fs::write(dir.path().join("003.txt"), "").unwrap();
    std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

    let set = GroundTruthSet::load(dir.path()).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.by_index(0).unwrap().stem, "001");
    assert_eq!(
      set.by_index(0).unwrap().primary_box(),
      Some(&BoundingBox::new(320, 320, 128, 128))
    );
    assert_eq!(set.plate("001.txt"), Some("SB40DAP"));
    assert_eq!(set.plate("002.txt"), Some("CJ11ABC"));
    assert_eq!(set.plate("003.txt"), None);
    assert!(set.by_stem("003").unwrap().boxes.is_empty());
    assert_eq!(set.plate_count(), 2);
  }

  #[test]
  fn missing_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = GroundTruthSet::load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, LabelError::DirectoryError(..)));
  }
}
