// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 检测结果与后处理
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

use serde::Serialize;

pub trait Model {
  type Input: ?Sized;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测目标，解码阶段的候选框与最终结果共用该结构
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectItem {
  pub class_id: usize,
  pub class_name: String,
  pub score: f64,
  pub bbox: [f64; 4], // [x_min, y_min, x_max, y_max]，输入图像像素坐标
}

impl DetectItem {
  pub fn area(&self) -> f64 {
    (self.bbox[2] - self.bbox[0]) * (self.bbox[3] - self.bbox[1])
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

mod decode;
mod nms;
mod yolo5;

pub(crate) use self::decode::decode_layer;
pub use self::decode::sigmoid;
pub use self::nms::{iou, nms};
pub use self::yolo5::{ParseError, ParseOutput, Yolo5Parser, parse_outputs};
