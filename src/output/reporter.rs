// 该文件是 Chepai （车牌） 项目的一部分。
// src/output/reporter.rs - 评测结果汇报
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

use tracing::{info, warn};

use crate::{
  output::{TrackingSession, TrackingSink},
  task::{DetectionResult, ModelOutcome, OcrResult},
};

pub const PARAM_PROJECT_NAME: &str = "Project Name";
pub const PARAM_LINK: &str = "Link";
pub const METRIC_IOU: &str = "IoU performance";
pub const METRIC_DETECTED: &str = "Number of Detected";
pub const METRIC_ACCURACY: &str = "Accuracy";
pub const METRIC_FULLY_DETECTED: &str = "Number of Fully-Detected";
pub const METRIC_TIME: &str = "Time";

/// 打印每个模型的结果，并把完整跑完的结果写入实验记录
///
/// 被中断的结果只打印，不写入实验记录。
pub struct Reporter<S> {
  sink: S,
}

impl<S: TrackingSink> Reporter<S> {
  pub fn new(sink: S) -> Self {
    Self { sink }
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  /// 返回成功写入实验记录的会话数
  pub fn report_detection(&self, outcomes: &[ModelOutcome<DetectionResult>], total: usize) -> usize {
    self.report(outcomes, |result| {
      (
        detection_summary(result, total),
        (!result.interrupted).then(|| detection_session(result)),
      )
    })
  }

  pub fn report_ocr(&self, outcomes: &[ModelOutcome<OcrResult>], total: usize) -> usize {
    self.report(outcomes, |result| {
      (
        ocr_summary(result, total),
        (!result.interrupted).then(|| ocr_session(result)),
      )
    })
  }

  fn report<R>(
    &self,
    outcomes: &[ModelOutcome<R>],
    render: impl Fn(&R) -> (String, Option<TrackingSession>),
  ) -> usize {
    let mut logged = 0;
    for outcome in outcomes {
      match outcome {
        ModelOutcome::Completed(result) => {
          let (summary, session) = render(result);
          println!("{}", summary);
          let Some(session) = session else {
            warn!("评测被中断，结果不写入实验记录");
            continue;
          };
          match self.sink.log_session(&session) {
            Ok(()) => logged += 1,
            Err(e) => warn!("写入实验记录失败: {}", e),
          }
        }
        ModelOutcome::Failed {
          model_name,
          source_link,
          reason,
        } => {
          println!("{}", failure_summary(model_name, source_link, reason));
        }
      }
    }
    info!("共写入 {}/{} 条实验记录", logged, outcomes.len());
    logged
  }
}

fn header(model_name: &str, source_link: &str) -> String {
  format!("Model Name: {} | Link: {}", model_name, source_link)
}

fn interrupted_note(interrupted: bool, evaluated: usize) -> String {
  if interrupted {
    format!("\nInterrupted after {} images", evaluated)
  } else {
    String::new()
  }
}

pub fn detection_summary(result: &DetectionResult, total: usize) -> String {
  format!(
    "{}\nIoU performance: {}\nDetected {}/{}\nTime: {}{}",
    header(&result.model_name, &result.source_link),
    result.mean_iou,
    result.detected_count,
    total,
    result.elapsed_seconds,
    interrupted_note(result.interrupted, result.evaluated_count)
  )
}

pub fn ocr_summary(result: &OcrResult, total: usize) -> String {
  format!(
    "{}\nAccuracy: {}\nFully Detected {}/{}\nTime: {}{}",
    header(&result.model_name, &result.source_link),
    result.char_accuracy,
    result.exact_match_count,
    total,
    result.elapsed_seconds,
    interrupted_note(result.interrupted, result.evaluated_count)
  )
}

pub fn failure_summary(model_name: &str, source_link: &str, reason: &str) -> String {
  format!("{}\nFailed: {}", header(model_name, source_link), reason)
}

pub fn detection_session(result: &DetectionResult) -> TrackingSession {
  TrackingSession::default()
    .param(PARAM_PROJECT_NAME, result.model_name.as_str())
    .param(PARAM_LINK, result.source_link.as_str())
    .metric(METRIC_IOU, result.mean_iou)
    .metric(METRIC_DETECTED, result.detected_count as f64)
    .metric(METRIC_TIME, result.elapsed_seconds)
}

pub fn ocr_session(result: &OcrResult) -> TrackingSession {
  TrackingSession::default()
    .param(PARAM_PROJECT_NAME, result.model_name.as_str())
    .param(PARAM_LINK, result.source_link.as_str())
    .metric(METRIC_ACCURACY, result.char_accuracy)
    .metric(METRIC_FULLY_DETECTED, result.exact_match_count as f64)
    .metric(METRIC_TIME, result.elapsed_seconds)
}
