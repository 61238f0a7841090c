// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 解析参数配置
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_file_path};

const YOLO5_STRIDES: [u32; 3] = [8, 16, 32];
const YOLO5_ANCHORS: [[(f64, f64); 3]; 3] = [
  [(10.0, 13.0), (16.0, 30.0), (33.0, 23.0)],
  [(30.0, 61.0), (62.0, 45.0), (59.0, 119.0)],
  [(116.0, 90.0), (156.0, 198.0), (373.0, 326.0)],
];
const YOLO5_CLASS_NAME: &str = "construction_cone";
const YOLO5_SCORE_THRESH: f64 = 0.3;
const YOLO5_NMS_THRESH: f64 = 0.65;
const YOLO5_NMS_TOP_K: usize = 5000;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("文件读取错误: {0}, 路径: {path}", path = .1.display())]
  Io(std::io::Error, PathBuf),
  #[error("配置文件解析错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("class_num = {0} 不合法, 仅支持 class_num > 0")]
  InvalidClassNum(i64),
  #[error("类别名称数量 {names} 与 class_num {class_num} 不一致")]
  ClassNamesMismatch { class_num: usize, names: usize },
  #[error("检测层配置不一致: strides 数量 {strides}, anchors 层数 {anchors}")]
  LayerCountMismatch { strides: usize, anchors: usize },
  #[error("第 {0} 层没有配置 anchor")]
  EmptyAnchors(usize),
  #[error("第 {0} 层 stride 不能为 0")]
  ZeroStride(usize),
  #[error("阈值 {name} = {value} 超出 [0, 1] 范围")]
  ThresholdOutOfRange { name: &'static str, value: f64 },
}

/// PTQ YOLOv5 输出解析参数
///
/// 由调用方在首次解析之前构造并校验，此后只读。
#[derive(Debug, Clone, PartialEq)]
pub struct Yolo5Config {
  pub strides: Vec<u32>,
  /// 每层的 anchor 列表，元素为 (宽, 高)
  pub anchors_table: Vec<Vec<(f64, f64)>>,
  pub class_num: usize,
  pub class_names: Vec<String>,
  pub score_threshold: f64,
  pub iou_threshold: f64,
  pub top_k: usize,
  /// 为 true 时不同类别的框之间也会相互抑制
  pub class_agnostic: bool,
}

impl Default for Yolo5Config {
  fn default() -> Self {
    Self {
      strides: YOLO5_STRIDES.to_vec(),
      anchors_table: YOLO5_ANCHORS.iter().map(|layer| layer.to_vec()).collect(),
      class_num: 1,
      class_names: vec![YOLO5_CLASS_NAME.to_string()],
      score_threshold: YOLO5_SCORE_THRESH,
      iou_threshold: YOLO5_NMS_THRESH,
      top_k: YOLO5_NMS_TOP_K,
      class_agnostic: false,
    }
  }
}

impl Yolo5Config {
  /// 单个 anchor 的通道数: 4 (框) + 1 (目标置信度) + 类别数
  pub fn num_pred(&self) -> usize {
    self.class_num + 4 + 1
  }

  pub fn num_layers(&self) -> usize {
    self.strides.len()
  }

  pub fn with_class_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
    self.class_names = names.into_iter().map(Into::into).collect();
    self.class_num = self.class_names.len();
    self
  }

  pub fn with_score_threshold(mut self, threshold: f64) -> Self {
    self.score_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f64) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn with_class_agnostic(mut self, class_agnostic: bool) -> Self {
    self.class_agnostic = class_agnostic;
    self
  }

  /// 检查类别名称数量是否与 class_num 一致
  pub fn check_class_names(&self) -> Result<(), ConfigError> {
    if self.class_names.len() != self.class_num {
      return Err(ConfigError::ClassNamesMismatch {
        class_num: self.class_num,
        names: self.class_names.len(),
      });
    }
    Ok(())
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.class_num == 0 {
      return Err(ConfigError::InvalidClassNum(0));
    }
    self.check_class_names()?;

    if self.strides.len() != self.anchors_table.len() {
      return Err(ConfigError::LayerCountMismatch {
        strides: self.strides.len(),
        anchors: self.anchors_table.len(),
      });
    }
    if let Some(layer) = self.strides.iter().position(|&s| s == 0) {
      return Err(ConfigError::ZeroStride(layer));
    }
    if let Some(layer) = self.anchors_table.iter().position(Vec::is_empty) {
      return Err(ConfigError::EmptyAnchors(layer));
    }

    for (name, value) in [
      ("score_threshold", self.score_threshold),
      ("iou_threshold", self.iou_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
      }
    }

    Ok(())
  }
}

/// 配置文件内容，缺省字段保持默认值
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
  class_num: Option<i64>,
  cls_names_list: Option<String>,
  score_threshold: Option<f64>,
  nms_threshold: Option<f64>,
  nms_top_k: Option<usize>,
  class_agnostic: Option<bool>,
  strides: Option<Vec<u32>>,
  anchors_table: Option<Vec<Vec<(f64, f64)>>>,
}

pub struct Yolo5ConfigBuilder {
  config_path: PathBuf,
  base: Yolo5Config,
}

impl FromUrlWithScheme for Yolo5ConfigBuilder {
  const SCHEME: &'static str = "config";
}

impl FromUrl for Yolo5ConfigBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ConfigError::SchemeMismatch);
    }

    Ok(Yolo5ConfigBuilder {
      config_path: url_file_path(url),
      base: Yolo5Config::default(),
    })
  }
}

impl Yolo5ConfigBuilder {
  pub fn with_path(path: impl Into<PathBuf>) -> Self {
    Self {
      config_path: path.into(),
      base: Yolo5Config::default(),
    }
  }

  /// 替换未在配置文件中出现的字段所使用的默认值
  pub fn base(mut self, base: Yolo5Config) -> Self {
    self.base = base;
    self
  }

  pub fn build(self) -> Result<Yolo5Config, ConfigError> {
    info!("加载配置文件: {}", self.config_path.display());
    let text = std::fs::read_to_string(&self.config_path)
      .map_err(|e| ConfigError::Io(e, self.config_path.clone()))?;
    let document: ConfigDocument = serde_json::from_str(&text)?;
    debug!("配置文件内容: {:?}", document);

    let mut config = self.base;

    if let Some(class_num) = document.class_num {
      if class_num <= 0 {
        error!("class_num = {} 不合法, 仅支持 class_num > 0", class_num);
        return Err(ConfigError::InvalidClassNum(class_num));
      }
      config.class_num = class_num as usize;
    }

    if let Some(names_file) = document.cls_names_list {
      let names_path = resolve_relative(&self.config_path, Path::new(&names_file));
      config.class_names = load_class_names(&names_path)?;
      if config.class_names.len() != config.class_num {
        error!(
          "类别名称数量 {} 与 class_num {} 不一致",
          config.class_names.len(),
          config.class_num
        );
        return Err(ConfigError::ClassNamesMismatch {
          class_num: config.class_num,
          names: config.class_names.len(),
        });
      }
    }

    if let Some(v) = document.score_threshold {
      config.score_threshold = v;
    }
    if let Some(v) = document.nms_threshold {
      config.iou_threshold = v;
    }
    if let Some(v) = document.nms_top_k {
      config.top_k = v;
    }
    if let Some(v) = document.class_agnostic {
      config.class_agnostic = v;
    }
    if let Some(v) = document.strides {
      config.strides = v;
    }
    if let Some(v) = document.anchors_table {
      config.anchors_table = v;
    }

    config.validate()?;
    info!(
      "配置加载完成: {} 个类别, {} 个检测层",
      config.class_num,
      config.num_layers()
    );
    Ok(config)
  }
}

/// 读取类别名称文件，每行一个名称
pub fn load_class_names(path: &Path) -> Result<Vec<String>, ConfigError> {
  debug!("读取类别名称文件: {}", path.display());
  let text = std::fs::read_to_string(path).map_err(|e| {
    error!("无法打开类别名称文件: {}", path.display());
    ConfigError::Io(e, path.to_path_buf())
  })?;
  Ok(text.lines().map(str::to_string).collect())
}

fn resolve_relative(config_path: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    return path.to_path_buf();
  }
  match config_path.parent() {
    Some(dir) => dir.join(path),
    None => path.to_path_buf(),
  }
}
