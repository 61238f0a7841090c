// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/parse_oneshot.rs - 单次解析输出张量
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_yolo5::{
  FromUrl,
  config::{Yolo5Config, Yolo5ConfigBuilder},
  model::Yolo5Parser,
  output::OutputWrapper,
  task::{OneShotTask, Task},
  tensor::RawTensorFile,
};
use tracing::info;

/// 解析 PTQ YOLOv5 输出张量
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件，如 config:///path/config.json；缺省使用内置配置
  #[arg(long, value_name = "CONFIG")]
  pub config: Option<Url>,
  /// 各检测层输出张量，按层顺序给出，
  /// 如 tensor:///path/layer0.bin?layout=nhwc&dims=1,80,80,18
  #[arg(long, value_name = "TENSOR", required = true)]
  pub layer: Vec<Url>,
  /// 输出路径，record:// 或 json://，路径为空时写到标准输出
  #[arg(long, value_name = "OUTPUT", default_value = "record://")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let config = match &args.config {
    Some(url) => {
      info!("配置文件: {}", url);
      Yolo5ConfigBuilder::from_url(url)?.build()?
    }
    None => {
      info!("使用内置配置");
      Yolo5Config::default()
    }
  };

  let tensors = args
    .layer
    .iter()
    .map(RawTensorFile::from_url)
    .collect::<Result<Vec<_>, _>>()?;
  info!("读取 {} 个输出张量", tensors.len());

  let parser = Yolo5Parser::new(config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(tensors.as_slice(), parser, output)?;

  Ok(())
}
