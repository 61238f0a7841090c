// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/decode.rs - 单层输出张量解码
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

use crate::{config::Yolo5Config, model::DetectItem};

/// 通道块中框参数与目标置信度之后的偏移
const CLASS_OFFSET: usize = 5;

#[inline]
pub fn sigmoid(x: f64) -> f64 {
  1.0 / (1.0 + (-x).exp())
}

/// 取最大值的下标，相同最大值取最小下标
#[inline]
fn argmax(values: &[f32]) -> usize {
  let mut best = 0usize;
  let mut max_value = values[0];
  for (i, &v) in values.iter().enumerate().skip(1) {
    if v > max_value {
      max_value = v;
      best = i;
    }
  }
  best
}

/// 解码一个检测层，将候选框追加到 `items`
///
/// 调用前须已校验: `data` 至少包含 `height * width * anchors.len() * config.num_pred()`
/// 个元素，且 `config.class_names` 与 `class_num` 一致；否则多余的网格单元和缺少名称的
/// 类别会被直接忽略。每个 anchor 的通道块为
/// `[cx, cy, w, h, objectness, class_0 .. class_{N-1}]`。
///
/// 返回本层产生的候选框数量。
pub(crate) fn decode_layer(
  data: &[f32],
  (height, width): (usize, usize),
  stride: u32,
  anchors: &[(f64, f64)],
  config: &Yolo5Config,
  items: &mut Vec<DetectItem>,
) -> usize {
  let num_pred = config.num_pred();
  let anchor_num = anchors.len();
  let stride = stride as f64;
  let before = items.len();

  if anchor_num == 0 || num_pred <= CLASS_OFFSET {
    return 0;
  }

  let blocks = data
    .chunks_exact(num_pred)
    .take(height.saturating_mul(width).saturating_mul(anchor_num))
    .enumerate();

  for (idx, block) in blocks {
    let cell = idx / anchor_num;
    let (anchor_w, anchor_h) = anchors[idx % anchor_num];
    let (h, w) = ((cell / width) as f64, (cell % width) as f64);

    let classes = &block[CLASS_OFFSET..];
    let class_id = argmax(classes);
    let confidence = sigmoid(block[4] as f64) * sigmoid(classes[class_id] as f64);

    // NaN 同样在此被丢弃
    if !(confidence >= config.score_threshold) {
      continue;
    }

    let box_cx = (sigmoid(block[0] as f64) * 2.0 - 0.5 + w) * stride;
    let box_cy = (sigmoid(block[1] as f64) * 2.0 - 0.5 + h) * stride;
    let box_w = (sigmoid(block[2] as f64) * 2.0).powi(2) * anchor_w;
    let box_h = (sigmoid(block[3] as f64) * 2.0).powi(2) * anchor_h;

    let xmin = box_cx - box_w / 2.0;
    let ymin = box_cy - box_h / 2.0;
    let xmax = box_cx + box_w / 2.0;
    let ymax = box_cy + box_h / 2.0;

    if xmax <= 0.0 || ymax <= 0.0 {
      continue;
    }
    // 只检查 min > max，宽或高为 0 的框会保留
    if xmin > xmax || ymin > ymax {
      continue;
    }
    if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
      continue;
    }

    let Some(class_name) = config.class_names.get(class_id) else {
      continue;
    };

    items.push(DetectItem {
      class_id,
      class_name: class_name.clone(),
      score: confidence,
      bbox: [xmin, ymin, xmax, ymax],
    });
  }

  items.len() - before
}
