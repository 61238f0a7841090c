// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/record.rs - 文本记录输出
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

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectResult,
  output::{OutputError, Render, Sink},
};

/// 每个检测目标一行: `name, score, x_min, y_min, x_max, y_max`
///
/// URL 查询参数 `record=id` 时以类别编号代替类别名称。
pub struct RecordOutput {
  sink: Sink,
  label_with_name: bool,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }

    let label_with_name = !url.query_pairs().any(|(k, v)| k == "record" && v == "id");

    Ok(RecordOutput {
      sink: Sink::from_url(url),
      label_with_name,
    })
  }
}

impl RecordOutput {
  pub fn format(&self, result: &DetectResult) -> String {
    let mut records = Vec::with_capacity(result.len());
    for item in result.items.iter() {
      let name = if self.label_with_name {
        item.class_name.clone()
      } else {
        item.class_id.to_string()
      };
      records.push(format!(
        "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
        name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
      ));
    }
    let mut text = records.join("\n");
    if !text.is_empty() {
      text.push('\n');
    }
    text
  }
}

impl Render<DetectResult> for RecordOutput {
  type Error = OutputError;

  fn render_result(&self, result: &DetectResult) -> Result<(), Self::Error> {
    self.sink.write(&self.format(result))?;
    Ok(())
  }
}
