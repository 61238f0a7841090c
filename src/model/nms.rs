// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use crate::model::DetectItem;

/// 已知面积时计算 IoU，交集宽或高不为正时返回 0
fn iou_with_areas(a: &[f64; 4], area_a: f64, b: &[f64; 4], area_b: f64) -> f64 {
  let xx1 = a[0].max(b[0]);
  let yy1 = a[1].max(b[1]);
  let xx2 = a[2].min(b[2]);
  let yy2 = a[3].min(b[3]);

  if !(xx2 > xx1 && yy2 > yy1) {
    return 0.0;
  }

  let intersection = (xx2 - xx1) * (yy2 - yy1);
  let union = area_a + area_b - intersection;
  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

/// 计算两个边界框 `[x_min, y_min, x_max, y_max]` 的 IoU
pub fn iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
  let area = |r: &[f64; 4]| (r[2] - r[0]) * (r[3] - r[1]);
  iou_with_areas(a, area(a), b, area(b))
}

/// 贪心非极大值抑制
///
/// 按置信度稳定降序排序后依次接受未被抑制的框，并抑制其后与之 IoU 大于
/// `iou_threshold` 的框。`class_agnostic` 为 false 时不同类别之间互不抑制。
/// 最多返回 `top_k` 个结果，顺序为接受顺序。
pub fn nms(
  mut candidates: Vec<DetectItem>,
  iou_threshold: f64,
  top_k: usize,
  class_agnostic: bool,
) -> Vec<DetectItem> {
  if candidates.is_empty() || top_k == 0 {
    return Vec::new();
  }

  // sort_by 为稳定排序，分数相同的框保持输入顺序
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let areas: Vec<f64> = candidates.iter().map(DetectItem::area).collect();
  let mut suppressed = vec![false; candidates.len()];
  let mut accepted = vec![false; candidates.len()];
  let mut count = 0usize;

  for i in 0..candidates.len() {
    if suppressed[i] {
      continue;
    }
    accepted[i] = true;
    count += 1;
    if count >= top_k {
      break;
    }

    for j in (i + 1)..candidates.len() {
      if suppressed[j] {
        continue;
      }
      if !class_agnostic && candidates[i].class_id != candidates[j].class_id {
        continue;
      }
      let ratio = iou_with_areas(
        &candidates[i].bbox,
        areas[i],
        &candidates[j].bbox,
        areas[j],
      );
      if ratio > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  candidates
    .into_iter()
    .zip(accepted)
    .filter_map(|(item, keep)| keep.then_some(item))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(class_id: usize, score: f64, bbox: [f64; 4]) -> DetectItem {
    DetectItem {
      class_id,
      class_name: format!("class{}", class_id),
      score,
      bbox,
    }
  }

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let b = [0.0, 0.0, 10.0, 10.0];
    assert_eq!(iou(&b, &b), 1.0);
  }

  #[test]
  fn touching_boxes_do_not_overlap() {
    let a = [0.0, 0.0, 10.0, 10.0];
    let b = [10.0, 0.0, 20.0, 10.0];
    assert_eq!(iou(&a, &b), 0.0);
  }

  #[test]
  fn degenerate_boxes_give_zero_iou() {
    let a = [5.0, 5.0, 5.0, 5.0];
    assert_eq!(iou(&a, &a), 0.0);
  }

  #[test]
  fn lower_score_overlap_is_suppressed() {
    // 交集 8x10=80，并集 100，IoU = 0.8
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(0, 0.8, [0.0, 0.0, 8.0, 10.0]);
    assert!((iou(&a.bbox, &b.bbox) - 0.8).abs() < 1e-12);

    let kept = nms(vec![b, a.clone()], 0.65, 100, false);
    assert_eq!(kept, vec![a]);
  }

  #[test]
  fn iou_equal_to_threshold_is_kept() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(0, 0.8, [0.0, 0.0, 5.0, 10.0]);
    let kept = nms(vec![a, b], 0.5, 100, false);
    assert_eq!(kept.len(), 2);
  }

  #[test]
  fn class_agnostic_crosses_classes() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(1, 0.8, [0.0, 0.0, 10.0, 10.0]);

    let kept = nms(vec![a.clone(), b.clone()], 0.65, 100, false);
    assert_eq!(kept, vec![a.clone(), b.clone()]);

    let kept = nms(vec![a.clone(), b], 0.65, 100, true);
    assert_eq!(kept, vec![a]);
  }

  #[test]
  fn ties_keep_input_order() {
    let a = item(0, 0.5, [0.0, 0.0, 1.0, 1.0]);
    let b = item(0, 0.5, [10.0, 10.0, 11.0, 11.0]);
    let c = item(0, 0.7, [20.0, 20.0, 21.0, 21.0]);
    let kept = nms(vec![a.clone(), b.clone(), c.clone()], 0.5, 100, false);
    assert_eq!(kept, vec![c, a, b]);
  }

  #[test]
  fn suppressed_box_does_not_suppress_others() {
    // b 被 a 抑制，c 只与 b 重叠，因此保留
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(0, 0.8, [1.0, 0.0, 11.0, 10.0]);
    let c = item(0, 0.7, [3.0, 0.0, 13.0, 10.0]);
    let kept = nms(vec![a.clone(), b, c.clone()], 0.65, 100, false);
    assert_eq!(kept, vec![a, c]);
  }

  #[test]
  fn top_k_limits_output() {
    let items: Vec<_> = (0..10)
      .map(|i| item(0, i as f64 / 10.0, [i as f64 * 20.0, 0.0, i as f64 * 20.0 + 5.0, 5.0]))
      .collect();
    let kept = nms(items, 0.5, 3, false);
    let scores: Vec<f64> = kept.iter().map(|d| d.score).collect();
    assert_eq!(scores, vec![0.9, 0.8, 0.7]);

    assert!(nms(vec![item(0, 0.9, [0.0, 0.0, 1.0, 1.0])], 0.5, 0, false).is_empty());
    assert!(nms(Vec::new(), 0.5, 10, false).is_empty());
  }
}
