// 该文件是 Chepai （车牌） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;

use chepai::{geometry::IouMode, notice::NOTICE_ENDPOINT};

/// Chepai 车牌检测与识别评测工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 评测车牌检测模型
  LicensePlate(DetectionArgs),
  /// 评测车牌文字识别模型
  Ocr(OcrArgs),
  /// 对单张车辆图像识别车牌并查询运输许可
  Infer(InferArgs),
  /// 按车牌号查询运输许可
  Lookup(LookupArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SinkArgs {
  /// 实验记录位置
  /// 支持格式:
  /// - mlflow+https://host/path?experiment_id=0
  /// - jsonl:///path/to/runs.jsonl
  /// - none:
  #[arg(long, env = "CHEPAI_SINK", default_value = "none:", value_name = "SINK")]
  pub sink: Url,
}

#[derive(ClapArgs, Debug)]
pub struct DetectionArgs {
  /// 测试图像目录
  #[arg(long, default_value = "data/test/images", value_name = "DIR")]
  pub images: PathBuf,

  /// YOLO 标注目录
  #[arg(long, default_value = "data/test/labels", value_name = "DIR")]
  pub labels: PathBuf,

  /// 待评测模型，可重复；缺省时评测内置的六个远程模型
  /// 支持格式:
  /// - roboflow://<project>/<version>?confidence=50&overlap=50
  /// - onnx:///path/to/model.onnx?confidence=0.4&iou=0.45
  /// - replay:///path/to/predictions
  #[arg(long = "model", value_name = "MODEL")]
  pub models: Vec<Url>,

  /// IoU 计算方式 (legacy, centered)
  #[arg(long, default_value = "legacy", value_name = "MODE")]
  pub iou_mode: IouMode,

  /// 保存对比图或预测记录，如 folder:///tmp/out 或 folder:///tmp/out?record
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  #[command(flatten)]
  pub sink: SinkArgs,
}

#[derive(ClapArgs, Debug)]
pub struct OcrArgs {
  /// 裁剪后的车牌图像目录
  #[arg(long, default_value = "data/cropped_ocr", value_name = "DIR")]
  pub images: PathBuf,

  /// 带车牌文本的标注目录
  #[arg(long, default_value = "data/test/labels", value_name = "DIR")]
  pub labels: PathBuf,

  /// 待评测模型，可重复；缺省时评测内置的三个 TrOCR 模型
  /// 支持格式:
  /// - hf://<org>/<model>
  /// - replay:///path/to/texts
  #[arg(long = "model", value_name = "MODEL")]
  pub models: Vec<Url>,

  #[command(flatten)]
  pub sink: SinkArgs,
}

#[derive(ClapArgs, Debug)]
pub struct InferArgs {
  /// 车辆图像
  #[arg(long, value_name = "FILE")]
  pub image: PathBuf,

  /// 车牌检测模型
  #[arg(long, value_name = "MODEL")]
  pub detector: Url,

  /// 车牌识别模型
  #[arg(long, default_value = "hf://microsoft/trocr-base-printed", value_name = "MODEL")]
  pub recognizer: Url,

  /// 运输许可查询接口
  #[arg(long, default_value = NOTICE_ENDPOINT, value_name = "URL")]
  pub notice_endpoint: Url,

  /// 只识别车牌，不查询运输许可
  #[arg(long)]
  pub skip_lookup: bool,
}

#[derive(ClapArgs, Debug)]
pub struct LookupArgs {
  /// 车牌号，会先规范化
  #[arg(required = true, value_name = "PLATE")]
  pub plates: Vec<String>,

  /// 运输许可查询接口
  #[arg(long, default_value = NOTICE_ENDPOINT, value_name = "URL")]
  pub notice_endpoint: Url,
}
