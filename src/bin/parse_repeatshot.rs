// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/parse_repeatshot.rs - 重复解析测速
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
  task::{RepeatShotTask, Task},
  tensor::RawTensorFile,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件，缺省使用内置配置
  #[arg(long, value_name = "CONFIG")]
  pub config: Option<Url>,
  /// 各检测层输出张量
  #[arg(long, value_name = "TENSOR", required = true)]
  pub layer: Vec<Url>,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "record://")]
  pub output: Url,
  /// 重复次数
  #[arg(long, value_name = "TIMES", default_value = "1000")]
  pub times: usize,
  /// 不计入平均耗时的预热次数
  #[arg(long, value_name = "WARMUP", default_value = "2")]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let config = match &args.config {
    Some(url) => Yolo5ConfigBuilder::from_url(url)?.build()?,
    None => Yolo5Config::default(),
  };
  let tensors = args
    .layer
    .iter()
    .map(RawTensorFile::from_url)
    .collect::<Result<Vec<_>, _>>()?;
  info!("读取 {} 个输出张量, 重复 {} 次", tensors.len(), args.times);

  let parser = Yolo5Parser::new(config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask::default()
    .with_times(args.times)
    .with_warmup(args.warmup)
    .run_task(tensors.as_slice(), parser, output)?;

  Ok(())
}
