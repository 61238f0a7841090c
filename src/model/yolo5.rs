// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/yolo5.rs - PTQ YOLOv5 输出解析
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

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
  config::{ConfigError, Yolo5Config},
  model::{DetectItem, DetectResult, Model, decode_layer, nms},
  tensor::{LayerTensor, RawTensorFile, ShapeError},
};

#[derive(Error, Debug)]
pub enum ParseError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
}

/// 一次解析的结果
///
/// `warnings` 记录被跳过的检测层，其余层的结果仍然有效。
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
  pub result: DetectResult,
  pub warnings: Vec<ShapeError>,
}

impl ParseOutput {
  pub fn is_complete(&self) -> bool {
    self.warnings.is_empty()
  }
}

/// PTQ YOLOv5 输出解析器，持有只读配置，可在多个线程间共享
#[derive(Debug, Clone)]
pub struct Yolo5Parser {
  config: Yolo5Config,
}

impl Yolo5Parser {
  pub fn new(config: Yolo5Config) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &Yolo5Config {
    &self.config
  }

  /// 解析一次推理的全部输出张量，第 i 个张量对应第 i 个检测层
  pub fn parse(&self, tensors: &[LayerTensor<'_>]) -> Result<ParseOutput, ParseError> {
    parse_outputs(&self.config, tensors)
  }
}

/// 解析入口: 逐层解码后做 NMS
///
/// 每次调用都会重新检查类别名称数量，不一致时整体失败、不返回部分结果；
/// 单个检测层形状无法解析时跳过该层并记录在 `warnings` 中。
pub fn parse_outputs(
  config: &Yolo5Config,
  tensors: &[LayerTensor<'_>],
) -> Result<ParseOutput, ParseError> {
  if let Err(e) = config.check_class_names() {
    error!("{}", e);
    return Err(e.into());
  }

  let mut candidates = Vec::new();
  let mut warnings = Vec::new();

  for (layer, tensor) in tensors.iter().enumerate() {
    match decode_tensor(config, layer, tensor, &mut candidates) {
      Ok(count) => debug!("检测层 {}: {} 个候选框", layer, count),
      Err(e) => {
        warn!("跳过检测层: {}", e);
        warnings.push(e);
      }
    }
  }

  debug!("共 {} 个候选框, 开始 NMS", candidates.len());
  let items = nms(
    candidates,
    config.iou_threshold,
    config.top_k,
    config.class_agnostic,
  );
  debug!("检测到 {} 个物体", items.len());

  Ok(ParseOutput {
    result: DetectResult::from(items),
    warnings,
  })
}

fn decode_tensor(
  config: &Yolo5Config,
  layer: usize,
  tensor: &LayerTensor<'_>,
  candidates: &mut Vec<DetectItem>,
) -> Result<usize, ShapeError> {
  let (stride, anchors) = match (config.strides.get(layer), config.anchors_table.get(layer)) {
    (Some(&stride), Some(anchors)) if !anchors.is_empty() => (stride, anchors),
    _ => {
      return Err(ShapeError::NoLayerConfig {
        layer,
        layers: config.num_layers(),
      });
    }
  };

  let (height, width) = tensor.grid_size(layer)?;
  let expected = height
    .checked_mul(width)
    .and_then(|n| n.checked_mul(anchors.len()))
    .and_then(|n| n.checked_mul(config.num_pred()))
    .ok_or(ShapeError::DimsOverflow {
      layer,
      dims: tensor.dims,
    })?;
  if tensor.data.len() < expected {
    return Err(ShapeError::BufferTooSmall {
      layer,
      expected,
      actual: tensor.data.len(),
    });
  }

  debug!(
    "检测层 {}: 网格 {}x{}, stride {}, {} 个 anchor",
    layer,
    height,
    width,
    stride,
    anchors.len()
  );
  Ok(decode_layer(
    tensor.data,
    (height, width),
    stride,
    anchors,
    config,
    candidates,
  ))
}

impl Model for Yolo5Parser {
  type Input = [RawTensorFile];
  type Output = ParseOutput;
  type Error = ParseError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let layers: Vec<LayerTensor<'_>> = input.iter().map(RawTensorFile::as_layer).collect();
    self.parse(&layers)
  }
}
