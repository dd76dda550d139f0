// 该文件是 Chepai （车牌） 项目的一部分。
// src/task/ocr.rs - 车牌文字识别评测
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

use std::{fmt::Display, path::Path, time::Instant};

use tracing::{debug, info, warn};

use crate::{
  FromUrl,
  frame::Frame,
  input::{ImageSample, InputError, list_images},
  label::{GroundTruthSet, normalize_plate, ocr_label_name},
  model::{Model, ModelSpec, Recognition},
  task::{ModelOutcome, SampleFailure, StopSignal, Task, run_models},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextScore {
  pub stem: String,
  /// 规范化后的识别结果
  pub predicted: String,
  pub expected: String,
  pub correct_chars: usize,
}

impl TextScore {
  pub fn is_exact(&self) -> bool {
    self.predicted == self.expected
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
  pub model_name: String,
  pub source_link: String,
  pub char_accuracy: f64,
  pub exact_match_count: usize,
  pub correct_chars: usize,
  pub total_chars: usize,
  pub evaluated_count: usize,
  pub elapsed_seconds: f64,
  pub scores: Vec<TextScore>,
  pub skipped: Vec<String>,
  pub failures: Vec<SampleFailure>,
  /// 被中断时只覆盖了部分图像
  pub interrupted: bool,
}

/// 逐位比较，只比较较短的长度，较长一方多出的字符不计分
pub fn positional_matches(predicted: &str, expected: &str) -> usize {
  predicted
    .chars()
    .zip(expected.chars())
    .filter(|(p, e)| p == e)
    .count()
}

pub struct OcrTask<'a> {
  images: &'a [ImageSample],
  ground_truth: &'a GroundTruthSet,
  stop: StopSignal,
}

impl<'a> OcrTask<'a> {
  pub fn new(images: &'a [ImageSample], ground_truth: &'a GroundTruthSet) -> Self {
    Self {
      images,
      ground_truth,
      stop: StopSignal::default(),
    }
  }

  pub fn with_stop(mut self, stop: StopSignal) -> Self {
    self.stop = stop;
    self
  }
}

impl<M> Task<M> for OcrTask<'_>
where
  M: Model<Input = Frame, Output = String>,
  M::Error: Display,
{
  type Output = OcrResult;

  fn run_task(&self, spec: &ModelSpec, model: &M) -> Self::Output {
    let mut scores = Vec::with_capacity(self.images.len());
    let mut skipped = Vec::new();
    let mut failures = Vec::new();
    let mut interrupted = false;

    let start = Instant::now();
    for sample in self.images {
      if self.stop.is_stopped() {
        warn!("评测被中断，模型 {} 只完成了部分图像", spec.name);
        interrupted = true;
        break;
      }

      let label_name = ocr_label_name(&sample.stem);
      let Some(expected) = self.ground_truth.plate(&label_name) else {
        warn!("找不到 {} 对应的车牌文本 {}，已排除", sample.stem, label_name);
        skipped.push(sample.stem.clone());
        continue;
      };

      let recognized = sample
        .load()
        .map_err(|e| e.to_string())
        .and_then(|frame| model.infer(&frame).map_err(|e| e.to_string()));
      let raw = match recognized {
        Ok(text) => text,
        Err(reason) => {
          warn!("图像 {} 识别失败: {}", sample.stem, reason);
          failures.push(SampleFailure {
            stem: sample.stem.clone(),
            reason,
          });
          continue;
        }
      };

      let predicted = normalize_plate(&raw);
      let correct_chars = positional_matches(&predicted, expected);
      debug!(
        "{}: 识别 {:?} -> {}, 真值 {}, 正确 {} 位",
        sample.stem, raw, predicted, expected, correct_chars
      );
      scores.push(TextScore {
        stem: sample.stem.clone(),
        predicted,
        expected: expected.to_string(),
        correct_chars,
      });
    }
    let elapsed_seconds = start.elapsed().as_secs_f64();

    let correct_chars = scores.iter().map(|s| s.correct_chars).sum::<usize>();
    let total_chars = scores.iter().map(|s| s.expected.chars().count()).sum::<usize>();
    let char_accuracy = if total_chars == 0 {
      0.0
    } else {
      correct_chars as f64 / total_chars as f64
    };

    let result = OcrResult {
      model_name: spec.name.clone(),
      source_link: spec.link.clone(),
      char_accuracy,
      exact_match_count: scores.iter().filter(|s| s.is_exact()).count(),
      correct_chars,
      total_chars,
      evaluated_count: scores.len(),
      elapsed_seconds,
      scores,
      skipped,
      failures,
      interrupted,
    };
    info!(
      "模型 {} 评测完成: 字符准确率 {:.4}, 完全匹配 {}/{}, 耗时 {:.2}s",
      result.model_name,
      result.char_accuracy,
      result.exact_match_count,
      result.evaluated_count,
      result.elapsed_seconds
    );
    result
  }
}

/// 在裁剪后的车牌图像目录上依次评测每个识别模型
pub fn evaluate_ocr(
  image_directory: impl AsRef<Path>,
  ground_truth: &GroundTruthSet,
  models: &[ModelSpec],
  stop: &StopSignal,
) -> Result<Vec<ModelOutcome<OcrResult>>, InputError> {
  let images = list_images(image_directory)?;
  let task = OcrTask::new(&images, ground_truth).with_stop(stop.clone());
  Ok(run_models(
    &task,
    models,
    |spec| Recognition::from_url(&spec.url),
    stop,
  ))
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use image::RgbImage;
  use url::Url;

  use super::*;
  use crate::label::GroundTruthEntry;

  struct FixedRecognizer(HashMap<String, String>);

  impl Model for FixedRecognizer {
    type Input = Frame;
    type Output = String;
    type Error = String;

    fn infer(&self, input: &Frame) -> Result<String, String> {
      self
        .0
        .get(input.name())
        .cloned()
        .ok_or_else(|| format!("没有 {} 的识别结果", input.name()))
    }
  }

  fn plate_entry(stem: &str, plate: &str) -> GroundTruthEntry {
    GroundTruthEntry {
      stem: stem.to_string(),
      boxes: Vec::new(),
      plate: Some(normalize_plate(plate)),
    }
  }

  fn write_images(dir: &Path, stems: &[&str]) -> Vec<ImageSample> {
    for stem in stems {
      RgbImage::new(8, 4)
        .save(dir.join(format!("{}.jpg", stem)))
        .unwrap();
    }
    list_images(dir).unwrap()
  }

  fn spec() -> ModelSpec {
    ModelSpec::new(
      "microsoft/trocr-base-printed",
      "https://huggingface.co/microsoft/trocr-base-printed",
      Url::parse("replay:///tmp").unwrap(),
    )
  }

  #[test]
  fn positional_matches_ignore_trailing() {
    assert_eq!(positional_matches("AB123CE", "AB123CD"), 6);
    assert_eq!(positional_matches("AB123CDXYZ", "AB123CD"), 7);
    assert_eq!(positional_matches("AB", "AB123CD"), 2);
    assert_eq!(positional_matches("", "AB"), 0);
  }

  #[test]
  fn one_wrong_character() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), &["001"]);
    let truth = GroundTruthSet::from_entries(vec![plate_entry("001", "AB123CD")]);
    let model = FixedRecognizer(HashMap::from([("001".to_string(), "ab 123-ce".to_string())]));

    let result = OcrTask::new(&images, &truth).run_task(&spec(), &model);
    assert_eq!(result.correct_chars, 6);
    assert_eq!(result.total_chars, 7);
    assert!((result.char_accuracy - 6.0 / 7.0).abs() < 1e-9);
    assert_eq!(result.exact_match_count, 0);
    assert_eq!(result.scores[0].predicted, "AB123CE");
  }

  #[test]
  fn short_stems_are_padded_for_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), &["7", "8"]);
    let truth = GroundTruthSet::from_entries(vec![plate_entry("007", "SB40DAP")]);
    let model = FixedRecognizer(HashMap::from([
      ("7".to_string(), "SB 40 DAP".to_string()),
      ("8".to_string(), "B20XYZ".to_string()),
    ]));

    let result = OcrTask::new(&images, &truth).run_task(&spec(), &model);
    assert_eq!(result.exact_match_count, 1);
    assert_eq!(result.evaluated_count, 1);
    assert_eq!(result.skipped, ["8"]);
    assert!((result.char_accuracy - 1.0).abs() < 1e-9);
  }

  #[test]
  fn recognition_failure_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), &["001", "002"]);
    let truth = GroundTruthSet::from_entries(vec![
      plate_entry("001", "B20XYZ"),
      plate_entry("002", "CJ01ABC"),
    ]);
    let model = FixedRecognizer(HashMap::from([("001".to_string(), "B20XYZ".to_string())]));

    let result = OcrTask::new(&images, &truth).run_task(&spec(), &model);
    assert_eq!(result.evaluated_count, 1);
    assert_eq!(result.total_chars, 6);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].stem, "002");
  }

  #[test]
  fn nothing_to_score_gives_zero_accuracy() {
    let truth = GroundTruthSet::default();
    let model = FixedRecognizer(HashMap::new());
    let result = OcrTask::new(&[], &truth).run_task(&spec(), &model);
    assert_eq!(result.char_accuracy, 0.0);
    assert_eq!(result.exact_match_count, 0);
  }

  #[test]
  fn stopped_task_is_marked_interrupted() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_images(dir.path(), &["001"]);
    let truth = GroundTruthSet::from_entries(vec![plate_entry("001", "B20XYZ")]);
    let model = FixedRecognizer(HashMap::from([("001".to_string(), "B20XYZ".to_string())]));

    let stop = StopSignal::default();
    stop.stop();
    let result = OcrTask::new(&images, &truth)
      .with_stop(stop)
      .run_task(&spec(), &model);
    assert!(result.interrupted);
    assert_eq!(result.evaluated_count, 0);
  }
}
