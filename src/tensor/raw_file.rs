// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor/raw_file.rs - 原始张量文件输入
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
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  tensor::{LayerTensor, TensorLayout},
  url_file_path,
};

const F32_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Error, Debug)]
pub enum RawTensorFileError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("张量文件长度 {0} 不是 4 字节的整数倍")]
  Misaligned(usize),
  #[error("张量维度参数无效: {0}")]
  InvalidDims(String),
}

/// 从文件读取的单层输出张量，内容为小端序 f32
///
/// URL 形式: `tensor:///path/layer0.bin?layout=nhwc&dims=1,80,80,18`
#[derive(Debug, Clone)]
pub struct RawTensorFile {
  data: Box<[f32]>,
  layout: TensorLayout,
  dims: [usize; 4],
}

impl FromUrlWithScheme for RawTensorFile {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for RawTensorFile {
  type Error = RawTensorFileError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RawTensorFileError::SchemaMismatch);
    }

    let mut layout = TensorLayout::Nhwc;
    let mut dims = None;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "layout" => layout = v.parse().unwrap_or(TensorLayout::Unknown),
        "dims" => dims = Some(parse_dims(&v)?),
        _ => debug!("忽略未知参数: {}={}", k, v),
      }
    }
    let dims = dims.ok_or_else(|| RawTensorFileError::InvalidDims("缺少 dims 参数".to_string()))?;

    let path = url_file_path(url);
    debug!("读取张量文件: {}", path.display());
    let bytes = std::fs::read(&path)?;
    let data = decode_f32_le(&bytes)?;
    debug!(
      "张量文件读取完成: {} 个元素, 布局 {:?}, 维度 {:?}",
      data.len(),
      layout,
      dims
    );

    Ok(RawTensorFile {
      data: data.into_boxed_slice(),
      layout,
      dims,
    })
  }
}

impl RawTensorFile {
  pub fn new(data: Vec<f32>, layout: TensorLayout, dims: [usize; 4]) -> Self {
    Self {
      data: data.into_boxed_slice(),
      layout,
      dims,
    }
  }

  pub fn as_layer(&self) -> LayerTensor<'_> {
    LayerTensor::new(&self.data, self.layout, self.dims)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

fn parse_dims(text: &str) -> Result<[usize; 4], RawTensorFileError> {
  let values = text
    .split(',')
    .map(|s| s.trim().parse::<usize>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| RawTensorFileError::InvalidDims(format!("{}: {}", text, e)))?;

  <[usize; 4]>::try_from(values)
    .map_err(|v| RawTensorFileError::InvalidDims(format!("需要 4 个维度, 实际 {}", v.len())))
}

fn decode_f32_le(bytes: &[u8]) -> Result<Vec<f32>, RawTensorFileError> {
  if bytes.len() % F32_BYTES != 0 {
    return Err(RawTensorFileError::Misaligned(bytes.len()));
  }
  Ok(
    bytes
      .chunks_exact(F32_BYTES)
      .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dims_need_four_values() {
    assert_eq!(parse_dims("1, 80,80,18").unwrap(), [1, 80, 80, 18]);
    assert!(matches!(
      parse_dims("80,80,18"),
      Err(RawTensorFileError::InvalidDims(_))
    ));
    assert!(matches!(
      parse_dims("1,a,80,18"),
      Err(RawTensorFileError::InvalidDims(_))
    ));
  }

  #[test]
  fn decodes_little_endian_floats() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1.5f32.to_le_bytes());
    bytes.extend_from_slice(&(-2.0f32).to_le_bytes());
    assert_eq!(decode_f32_le(&bytes).unwrap(), vec![1.5, -2.0]);
    assert!(matches!(
      decode_f32_le(&bytes[..5]),
      Err(RawTensorFileError::Misaligned(5))
    ));
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/layer0.bin?dims=1,1,1,6").unwrap();
    assert!(matches!(
      RawTensorFile::from_url(&url),
      Err(RawTensorFileError::SchemaMismatch)
    ));
  }
}
