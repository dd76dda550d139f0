// 该文件是 Chepai （车牌） 项目的一部分。
// tests/evaluation.rs - 基于回放模型的端到端评测
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

use image::RgbImage;
use url::Url;

use chepai::{
  FromUrl,
  geometry::IouMode,
  label::GroundTruthSet,
  model::ModelSpec,
  output::{DirectoryOutput, JsonlSink, Reporter},
  task::{ModelOutcome, StopSignal, evaluate_detection, evaluate_ocr},
};

fn write(dir: &Path, name: &str, content: &str) {
  std::fs::create_dir_all(dir).unwrap();
  std::fs::write(dir.join(name), content).unwrap();
}

fn write_images(dir: &Path, stems: &[&str], (width, height): (u32, u32)) {
  std::fs::create_dir_all(dir).unwrap();
  for stem in stems {
    RgbImage::new(width, height)
      .save(dir.join(format!("{}.jpg", stem)))
      .unwrap();
  }
}

fn url_for(scheme: &str, path: &Path, query: &str) -> Url {
  Url::parse(&format!("{}://{}{}", scheme, path.display(), query)).unwrap()
}

/// 三张 1280×960 图像：001 与 003 预测完全正确，002 没有预测
fn detection_fixture(root: &Path) {
  write_images(&root.join("images"), &["001", "002", "003"], (1280, 960));

  let labels = root.join("labels");
  write(&labels, "001.txt", "0 0.5 0.5 0.2 0.1\nSB40DAP\n");
  write(&labels, "002.txt", "0 0.25 0.75 0.1 0.05\nB-20 XYZ\n");
  write(&labels, "003.txt", "0 0.75 0.25 0.2 0.1\n");

  let predictions = root.join("predictions");
  write(&predictions, "001.txt", "0 0.5 0.5 0.2 0.1 0.93\n");
  write(&predictions, "003.txt", "0 0.75 0.25 0.2 0.1 0.88\n0 0.1 0.1 0.05 0.05 0.2\n");
}

#[test]
fn detection_with_missing_prediction() {
  let root = tempfile::tempdir().unwrap();
  detection_fixture(root.path());

  let ground_truth = GroundTruthSet::load(root.path().join("labels")).unwrap();
  assert_eq!(ground_truth.len(), 3);
  assert_eq!(ground_truth.plate("001.txt"), Some("SB40DAP"));
  assert_eq!(ground_truth.plate("002.txt"), Some("B20XYZ"));

  let models = vec![
    ModelSpec::from_url(&url_for("replay", &root.path().join("predictions"), "?name=replayed")).unwrap(),
    ModelSpec::from_url(&url_for("replay", &root.path().join("absent"), "")).unwrap(),
  ];
  let outcomes = evaluate_detection(
    root.path().join("images"),
    &ground_truth,
    &models,
    IouMode::Legacy,
    None,
    &StopSignal::default(),
  )
  .unwrap();

  assert_eq!(outcomes.len(), 2);
  let result = outcomes[0].completed().unwrap();
  assert_eq!(result.model_name, "replayed");
  assert!(!result.interrupted);
  assert!((result.mean_iou - 2.0 / 3.0).abs() < 1e-6);
  assert_eq!(result.detected_count, 2);
  assert_eq!(result.evaluated_count, 3);
  assert_eq!(result.scores[1].predicted, None);
  assert!(matches!(&outcomes[1], ModelOutcome::Failed { model_name, .. } if model_name == "absent"));
}

#[test]
fn recorded_predictions_replay_identically() {
  let root = tempfile::tempdir().unwrap();
  detection_fixture(root.path());
  let ground_truth = GroundTruthSet::load(root.path().join("labels")).unwrap();
  let images = root.path().join("images");

  let record_dir = root.path().join("records");
  let output = DirectoryOutput::from_url(&url_for("folder", &record_dir, "?record")).unwrap();
  let models =
    vec![ModelSpec::from_url(&url_for("replay", &root.path().join("predictions"), "")).unwrap()];
  let first = evaluate_detection(
    &images,
    &ground_truth,
    &models,
    IouMode::Centered,
    Some(&output),
    &StopSignal::default(),
  )
  .unwrap();
  assert!(record_dir.join("predictions").join("003.txt").is_file());

  let replayed =
    vec![ModelSpec::from_url(&url_for("replay", &record_dir.join("predictions"), "")).unwrap()];
  let second = evaluate_detection(
    &images,
    &ground_truth,
    &replayed,
    IouMode::Centered,
    None,
    &StopSignal::default(),
  )
  .unwrap();

  let (first, second) = (first[0].completed().unwrap(), second[0].completed().unwrap());
  assert_eq!(first.mean_iou, second.mean_iou);
  assert_eq!(first.detected_count, second.detected_count);
}

#[test]
fn stopped_run_evaluates_nothing() {
  let root = tempfile::tempdir().unwrap();
  detection_fixture(root.path());
  let ground_truth = GroundTruthSet::load(root.path().join("labels")).unwrap();
  let models =
    vec![ModelSpec::from_url(&url_for("replay", &root.path().join("predictions"), "")).unwrap()];

  let stop = StopSignal::default();
  stop.stop();
  let outcomes = evaluate_detection(
    root.path().join("images"),
    &ground_truth,
    &models,
    IouMode::Legacy,
    None,
    &stop,
  )
  .unwrap();
  assert!(outcomes.is_empty());
}

#[test]
fn ocr_scores_and_reports_to_jsonl() {
  let root = tempfile::tempdir().unwrap();
  write_images(&root.path().join("cropped"), &["7", "8", "9"], (16, 16));

  let labels = root.path().join("labels");
  write(&labels, "007.txt", "0 0.5 0.5 0.2 0.1\nAB 123 CD\n");
  write(&labels, "008.txt", "0 0.5 0.5 0.2 0.1\nSB40DAP\n");

  let texts = root.path().join("texts");
  write(&texts, "7.txt", "ab-123-ce\n");
  write(&texts, "8.txt", "sb 40 dap\n");
  write(&texts, "9.txt", "ZZ99ZZZ\n");

  let ground_truth = GroundTruthSet::load(&labels).unwrap();
  assert_eq!(ground_truth.plate_count(), 2);
  let models = vec![ModelSpec::from_url(&url_for("replay", &texts, "?name=trocr-replay")).unwrap()];
  let outcomes = evaluate_ocr(
    root.path().join("cropped"),
    &ground_truth,
    &models,
    &StopSignal::default(),
  )
  .unwrap();

  let result = outcomes[0].completed().unwrap();
  assert_eq!(result.correct_chars, 13);
  assert_eq!(result.total_chars, 14);
  assert_eq!(result.exact_match_count, 1);
  assert_eq!(result.skipped, ["9"]);

  let runs = root.path().join("runs.jsonl");
  let sink = JsonlSink::from_url(&url_for("jsonl", &runs, "")).unwrap();
  let logged = Reporter::new(sink).report_ocr(&outcomes, ground_truth.plate_count());
  assert_eq!(logged, 1);

  let content = std::fs::read_to_string(&runs).unwrap();
  let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
  assert_eq!(line["params"]["Project Name"], "trocr-replay");
  assert_eq!(line["metrics"]["Number of Fully-Detected"], 1.0);
}
