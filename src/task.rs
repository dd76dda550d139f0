// 该文件是 Chepai （车牌） 项目的一部分。
// src/task.rs - 评测任务
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
  fmt::Display,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use tracing::{error, info, warn};

use crate::model::ModelSpec;

mod detection;
pub use self::detection::{DetectionResult, DetectionTask, ImageScore, evaluate_detection};

mod ocr;
pub use self::ocr::{OcrResult, OcrTask, TextScore, evaluate_ocr, positional_matches};

/// 对单个模型完整跑一遍评测集
pub trait Task<M> {
  type Output;

  fn run_task(&self, spec: &ModelSpec, model: &M) -> Self::Output;
}

/// 中断标志，由 Ctrl-C 设置，评测在图像之间与模型之间检查
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
  /// 安装 Ctrl-C 处理器并返回对应的标志
  pub fn install() -> Result<Self, ctrlc::Error> {
    let signal = StopSignal::default();
    let flag = signal.0.clone();
    ctrlc::set_handler(move || {
      warn!("收到中断信号，当前模型结束后退出...");
      flag.store(true, Ordering::SeqCst);
    })?;
    Ok(signal)
  }

  pub fn stop(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_stopped(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// 单张图像的推理失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFailure {
  pub stem: String,
  pub reason: String,
}

/// 一个模型的评测结果，模型无法构建时为带原因的失败
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome<R> {
  Completed(R),
  Failed {
    model_name: String,
    source_link: String,
    reason: String,
  },
}

impl<R> ModelOutcome<R> {
  pub fn completed(&self) -> Option<&R> {
    match self {
      ModelOutcome::Completed(result) => Some(result),
      ModelOutcome::Failed { .. } => None,
    }
  }
}

/// 依次构建并评测每个模型；单个模型失败不影响其余模型
pub fn run_models<T, M, E, B>(
  task: &T,
  models: &[ModelSpec],
  mut build: B,
  stop: &StopSignal,
) -> Vec<ModelOutcome<T::Output>>
where
  T: Task<M>,
  E: Display,
  B: FnMut(&ModelSpec) -> Result<M, E>,
{
  let mut outcomes = Vec::with_capacity(models.len());
  for spec in models {
    if stop.is_stopped() {
      warn!("评测被中断，跳过剩余 {} 个模型", models.len() - outcomes.len());
      break;
    }

    info!("评测模型: {}", spec.name);
    let model = match build(spec) {
      Ok(model) => model,
      Err(e) => {
        error!("模型 {} 构建失败: {}", spec.name, e);
        outcomes.push(ModelOutcome::Failed {
          model_name: spec.name.clone(),
          source_link: spec.link.clone(),
          reason: e.to_string(),
        });
        continue;
      }
    };

    outcomes.push(ModelOutcome::Completed(task.run_task(spec, &model)));
  }
  outcomes
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
  let count = values.len();
  if count == 0 {
    return 0.0;
  }
  values.sum::<f64>() / count as f64
}
