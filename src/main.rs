// 该文件是 Chepai （车牌） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use chepai::{
  FromUrl, catalog,
  input::ImageSample,
  label::{GroundTruthSet, normalize_plate},
  model::{Detection, ModelSpec, Recognition},
  notice::LegalNoticeClient,
  output::{DirectoryOutput, Reporter, SinkWrapper},
  pipeline::PlatePipeline,
  task::{StopSignal, evaluate_detection, evaluate_ocr},
};

use args::{Args, Command, DetectionArgs, InferArgs, LookupArgs, OcrArgs};

/// 命令行给出的模型 URL，缺省时使用内置列表
fn model_specs(
  urls: &[Url],
  defaults: fn() -> Result<Vec<ModelSpec>, url::ParseError>,
) -> Result<Vec<ModelSpec>> {
  if urls.is_empty() {
    return defaults().context("内置模型列表无效");
  }
  urls
    .iter()
    .map(|url| ModelSpec::from_url(url).with_context(|| format!("无效的模型地址: {}", url)))
    .collect()
}

fn license_plate(args: DetectionArgs, stop: &StopSignal) -> Result<()> {
  info!("图像目录: {}", args.images.display());
  info!("标注目录: {}", args.labels.display());
  info!("IoU 计算方式: {:?}", args.iou_mode);

  let ground_truth = GroundTruthSet::load(&args.labels).context("读取标注失败")?;
  let models = model_specs(&args.models, catalog::detection_models)?;
  let output = args
    .output
    .as_ref()
    .map(DirectoryOutput::from_url)
    .transpose()
    .context("创建输出失败")?;
  let sink = SinkWrapper::from_url(&args.sink.sink).context("创建实验记录失败")?;

  let outcomes = evaluate_detection(
    &args.images,
    &ground_truth,
    &models,
    args.iou_mode,
    output.as_ref(),
    stop,
  )
  .context("读取图像失败")?;
  Reporter::new(sink).report_detection(&outcomes, ground_truth.len());
  Ok(())
}

fn ocr(args: OcrArgs, stop: &StopSignal) -> Result<()> {
  info!("图像目录: {}", args.images.display());
  info!("标注目录: {}", args.labels.display());

  let ground_truth = GroundTruthSet::load(&args.labels).context("读取标注失败")?;
  let models = model_specs(&args.models, catalog::recognition_models)?;
  let sink = SinkWrapper::from_url(&args.sink.sink).context("创建实验记录失败")?;

  let outcomes = evaluate_ocr(&args.images, &ground_truth, &models, stop).context("读取图像失败")?;
  Reporter::new(sink).report_ocr(&outcomes, ground_truth.plate_count());
  Ok(())
}

fn infer(args: InferArgs) -> Result<()> {
  info!("车辆图像: {}", args.image.display());
  info!("检测模型: {}", args.detector);
  info!("识别模型: {}", args.recognizer);

  let frame = ImageSample::from_path(&args.image)
    .load()
    .context("读取图像失败")?;
  let detector = Detection::from_url(&args.detector).context("加载检测模型失败")?;
  let recognizer = Recognition::from_url(&args.recognizer).context("加载识别模型失败")?;

  let mut pipeline = PlatePipeline::new(detector, recognizer);
  if !args.skip_lookup {
    let client = LegalNoticeClient::from_url(&args.notice_endpoint).context("创建查询客户端失败")?;
    pipeline = pipeline.with_notices(client);
  }

  let reading = pipeline.run(&frame)?;
  println!("{}", reading.plate);
  if !args.skip_lookup {
    print_notices(&reading.notices);
  }
  Ok(())
}

fn lookup(args: LookupArgs, stop: &StopSignal) -> Result<()> {
  let client = LegalNoticeClient::from_url(&args.notice_endpoint).context("创建查询客户端失败")?;
  for plate in args.plates.iter().map(|p| normalize_plate(p)) {
    if stop.is_stopped() {
      warn!("查询被中断");
      break;
    }
    println!("{}", plate);
    let notices = client
      .lookup(&plate)
      .with_context(|| format!("查询车牌 {} 失败", plate))?;
    print_notices(&notices);
  }
  Ok(())
}

fn print_notices(notices: &[chepai::notice::LegalNotice]) {
  if notices.is_empty() {
    println!("Legal Notice not found");
  }
  for notice in notices {
    println!("{}", notice);
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();
  let stop = StopSignal::install().context("无法安装中断处理器")?;

  match args.command {
    Command::LicensePlate(args) => license_plate(args, &stop),
    Command::Ocr(args) => ocr(args, &stop),
    Command::Infer(args) => infer(args),
    Command::Lookup(args) => lookup(args, &stop),
  }
}
