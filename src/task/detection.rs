// 该文件是 Chepai （车牌） 项目的一部分。
// src/task/detection.rs - 车牌检测评测
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
  geometry::{BoundingBox, IouMode},
  input::{ImageSample, InputError, list_images},
  label::GroundTruthSet,
  model::{DetectResult, Detection, Model, ModelSpec},
  output::{DetectionSample, DirectoryOutput, Render},
  task::{ModelOutcome, SampleFailure, StopSignal, Task, mean, run_models},
};

/// 单张图像的得分，按图像名与真值配对
#[derive(Debug, Clone, PartialEq)]
pub struct ImageScore {
  pub stem: String,
  pub iou: f64,
  /// 没有检测结果时为 `None`
  pub predicted: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
  pub model_name: String,
  pub source_link: String,
  pub mean_iou: f64,
  /// IoU 不为 0 的图像数
  pub detected_count: usize,
  pub evaluated_count: usize,
  pub elapsed_seconds: f64,
  pub scores: Vec<ImageScore>,
  /// 没有真值而被排除的图像
  pub skipped: Vec<String>,
  pub failures: Vec<SampleFailure>,
  /// 被中断时只覆盖了部分图像
  pub interrupted: bool,
}

pub struct DetectionTask<'a> {
  images: &'a [ImageSample],
  ground_truth: &'a GroundTruthSet,
  iou_mode: IouMode,
  output: Option<&'a DirectoryOutput>,
  stop: StopSignal,
}

impl<'a> DetectionTask<'a> {
  pub fn new(images: &'a [ImageSample], ground_truth: &'a GroundTruthSet) -> Self {
    Self {
      images,
      ground_truth,
      iou_mode: IouMode::default(),
      output: None,
      stop: StopSignal::default(),
    }
  }

  pub fn with_iou_mode(mut self, iou_mode: IouMode) -> Self {
    self.iou_mode = iou_mode;
    self
  }

  pub fn with_output(mut self, output: Option<&'a DirectoryOutput>) -> Self {
    self.output = output;
    self
  }

  pub fn with_stop(mut self, stop: StopSignal) -> Self {
    self.stop = stop;
    self
  }

  pub fn stop_signal(&self) -> &StopSignal {
    &self.stop
  }
}

impl<M> Task<M> for DetectionTask<'_>
where
  M: Model<Input = Frame, Output = DetectResult>,
  M::Error: Display,
{
  type Output = DetectionResult;

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

      let Some(truth) = self
        .ground_truth
        .by_stem(&sample.stem)
        .and_then(|e| e.primary_box())
      else {
        warn!("图像 {} 没有真值边界框，已排除", sample.stem);
        skipped.push(sample.stem.clone());
        continue;
      };

      let detections = match sample
        .load()
        .map_err(|e| e.to_string())
        .and_then(|frame| {
          model
            .infer(&frame)
            .map(|d| (frame, d))
            .map_err(|e| e.to_string())
        }) {
        Ok(result) => result,
        Err(reason) => {
          warn!("图像 {} 推理失败: {}", sample.stem, reason);
          failures.push(SampleFailure {
            stem: sample.stem.clone(),
            reason,
          });
          continue;
        }
      };
      let (frame, detections) = detections;
      let detections = detections.to_reference_frame(frame.width(), frame.height());

      let predicted = detections.first().map(|item| item.bbox);
      let iou = predicted
        .map(|bbox| bbox.iou(truth, self.iou_mode))
        .unwrap_or(0.0);
      debug!(
        "{}: 预测 {:?}, 真值 {:?}, IoU {:.4}",
        sample.stem, predicted, truth, iou
      );

      if let Some(output) = self.output {
        let rendered = output.render_result(
          &frame,
          &DetectionSample {
            model_name: &spec.name,
            detections: &detections,
            truth,
          },
        );
        if let Err(e) = rendered {
          warn!("保存图像 {} 的评测输出失败: {}", sample.stem, e);
        }
      }

      scores.push(ImageScore {
        stem: sample.stem.clone(),
        iou,
        predicted,
      });
    }
    let elapsed_seconds = start.elapsed().as_secs_f64();

    let result = DetectionResult {
      model_name: spec.name.clone(),
      source_link: spec.link.clone(),
      mean_iou: mean(scores.iter().map(|s| s.iou)),
      detected_count: scores.iter().filter(|s| s.iou != 0.0).count(),
      evaluated_count: scores.len(),
      elapsed_seconds,
      scores,
      skipped,
      failures,
      interrupted,
    };
    info!(
      "模型 {} 评测完成: 平均 IoU {:.4}, 检出 {}/{}, 耗时 {:.2}s",
      result.model_name,
      result.mean_iou,
      result.detected_count,
      result.evaluated_count,
      result.elapsed_seconds
    );
    result
  }
}

/// 在图像目录上依次评测每个检测模型
///
/// 只有图像目录无法读取时返回错误，单个模型或图像的失败记录在结果中。
pub fn evaluate_detection(
  image_directory: impl AsRef<Path>,
  ground_truth: &GroundTruthSet,
  models: &[ModelSpec],
  iou_mode: IouMode,
  output: Option<&DirectoryOutput>,
  stop: &StopSignal,
) -> Result<Vec<ModelOutcome<DetectionResult>>, InputError> {
  let images = list_images(image_directory)?;
  let task = DetectionTask::new(&images, ground_truth)
    .with_iou_mode(iou_mode)
    .with_output(output)
    .with_stop(stop.clone());
  Ok(run_models(
    &task,
    models,
    |spec| Detection::from_url(&spec.url),
    stop,
  ))
}
