// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
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

use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::model::{DetectResult, ParseOutput};
use crate::{FromUrl, FromUrlWithScheme};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

mod json;
mod record;

pub use self::json::JsonOutput;
pub use self::record::RecordOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 输出目标，路径为空时写到标准输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sink {
  Stdout,
  File(PathBuf),
}

impl Sink {
  pub(crate) fn from_url(url: &Url) -> Self {
    let path = crate::url_file_path(url);
    if path.as_os_str().is_empty() || path.as_os_str() == "/" {
      Sink::Stdout
    } else {
      Sink::File(path)
    }
  }

  pub(crate) fn write(&self, text: &str) -> Result<(), std::io::Error> {
    match self {
      Sink::Stdout => {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
      }
      Sink::File(path) => std::fs::write(path, text),
    }
  }
}

pub enum OutputWrapper {
  Record(RecordOutput),
  Json(JsonOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      RecordOutput::SCHEME => Ok(OutputWrapper::Record(RecordOutput::from_url(url)?)),
      JsonOutput::SCHEME => Ok(OutputWrapper::Json(JsonOutput::from_url(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Record(output) => output.render_result(result),
      OutputWrapper::Json(output) => output.render_result(result),
    }
  }
}

impl Render<ParseOutput> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, output: &ParseOutput) -> Result<(), Self::Error> {
    for w in output.warnings.iter() {
      warn!("检测层 {} 未参与解析: {}", w.layer(), w);
    }
    self.render_result(&output.result)
  }
}
