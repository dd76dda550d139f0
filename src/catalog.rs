// 该文件是 Chepai （车牌） 项目的一部分。
// src/catalog.rs - 内置的待评测模型列表
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

use url::Url;

use crate::model::ModelSpec;

/// (项目名, 来源链接)
const DETECTION_MODELS: [(&str, &str); 6] = [
  (
    "spz-trcrj",
    "https://universe.roboflow.com/arcanus-mazikeen-pt3bj/spz-trcrj",
  ),
  (
    "licens-plate-4fobp",
    "https://universe.roboflow.com/kerb/licens-plate-4fobp",
  ),
  (
    "license-plate-nmu02",
    "https://universe.roboflow.com/swakshwar-ghosh-fjvq8/license-plate-nmu02/model/1",
  ),
  (
    "anpr-ublyc",
    "https://universe.roboflow.com/anpr-hqruj/anpr-ublyc/model/1",
  ),
  (
    "number-plates-9gzii",
    "https://universe.roboflow.com/pm-lb22v/number-plates-9gzii",
  ),
  (
    "license_plate_dataset",
    "https://universe.roboflow.com/wood-guard/license_plate_dataset/model/1",
  ),
];

const RECOGNITION_MODELS: [&str; 3] = [
  "microsoft/trocr-base-printed",
  "microsoft/trocr-large-printed",
  "microsoft/trocr-small-printed",
];

/// 六个远程托管的车牌检测模型，均使用版本 1
pub fn detection_models() -> Result<Vec<ModelSpec>, url::ParseError> {
  DETECTION_MODELS
    .iter()
    .map(|(project, link)| {
      let url = Url::parse(&format!("roboflow://{}/1", project))?;
      Ok(ModelSpec::new(*project, *link, url))
    })
    .collect()
}

/// 三个 TrOCR 印刷体识别模型
pub fn recognition_models() -> Result<Vec<ModelSpec>, url::ParseError> {
  RECOGNITION_MODELS
    .iter()
    .map(|id| {
      let url = Url::parse(&format!("hf://{}", id))?;
      Ok(ModelSpec::new(*id, format!("https://huggingface.co/{}", id), url))
    })
    .collect()
}
