// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor.rs - 输出张量视图与形状解析
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

use std::str::FromStr;

use thiserror::Error;

mod raw_file;
pub use self::raw_file::{RawTensorFile, RawTensorFileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
  Nhwc,
  Nchw,
  /// 推理引擎给出的其他布局，无法确定网格尺寸
  Unknown,
}

impl FromStr for TensorLayout {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.to_ascii_lowercase().as_str() {
      "nhwc" => TensorLayout::Nhwc,
      "nchw" => TensorLayout::Nchw,
      _ => TensorLayout::Unknown,
    })
  }
}

/// 某个检测层无法解码的原因，该层会被跳过
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
  #[error("第 {layer} 层张量布局不受支持: {layout:?}")]
  UnsupportedLayout { layer: usize, layout: TensorLayout },
  #[error("第 {layer} 层张量长度不足: 期望至少 {expected}, 实际 {actual}")]
  BufferTooSmall {
    layer: usize,
    expected: usize,
    actual: usize,
  },
  #[error("第 {layer} 层没有对应的 stride/anchor 配置 (共 {layers} 层)")]
  NoLayerConfig { layer: usize, layers: usize },
  #[error("第 {layer} 层张量维度过大: {dims:?}")]
  DimsOverflow { layer: usize, dims: [usize; 4] },
}

impl ShapeError {
  pub fn layer(&self) -> usize {
    match self {
      ShapeError::UnsupportedLayout { layer, .. }
      | ShapeError::BufferTooSmall { layer, .. }
      | ShapeError::NoLayerConfig { layer, .. }
      | ShapeError::DimsOverflow { layer, .. } => *layer,
    }
  }
}

/// 单个检测层的输出张量（只读借用）
///
/// 数据按网格单元行优先排列，其次是 anchor，最后是通道，与 `layout` 标记无关；
/// `layout` 与 `dims` 只用于确定网格的高和宽。
#[derive(Debug, Clone, Copy)]
pub struct LayerTensor<'a> {
  pub data: &'a [f32],
  pub layout: TensorLayout,
  pub dims: [usize; 4],
}

impl<'a> LayerTensor<'a> {
  pub fn new(data: &'a [f32], layout: TensorLayout, dims: [usize; 4]) -> Self {
    Self { data, layout, dims }
  }

  /// 以 NHWC 形式描述一个 `height x width x channels` 的张量
  pub fn nhwc(data: &'a [f32], height: usize, width: usize, channels: usize) -> Self {
    Self::new(data, TensorLayout::Nhwc, [1, height, width, channels])
  }

  /// 返回 (height, width)
  pub fn grid_size(&self, layer: usize) -> Result<(usize, usize), ShapeError> {
    let (h_index, w_index) = match self.layout {
      TensorLayout::Nhwc => (1, 2),
      TensorLayout::Nchw => (2, 3),
      TensorLayout::Unknown => {
        return Err(ShapeError::UnsupportedLayout {
          layer,
          layout: self.layout,
        });
      }
    };
    Ok((self.dims[h_index], self.dims[w_index]))
  }
}
