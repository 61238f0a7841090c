// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 解析任务
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

use std::time::Duration;
use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<M: Model, O>: Sized {
  type Error;
  fn run_task(self, input: &M::Input, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  M: Model<Output = D, Error = ME>,
  O: Render<D, Error = RE>,
> Task<M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: &M::Input, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始解析...");
    let now = std::time::Instant::now();
    let result = model.infer(input)?;
    let elapsed = now.elapsed();
    info!("解析完成，耗时: {:.2?}", elapsed);
    output.render_result(&result)?;
    info!("输出完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 重复解析同一组输出张量，统计平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  times: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      times: 1000,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times;
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }

  /// 去掉预热轮次后的平均耗时
  fn average(&self, times: &[Duration]) -> Option<Duration> {
    let measured = times.get(self.warmup..)?;
    if measured.is_empty() {
      return None;
    }
    Some(measured.iter().sum::<Duration>() / measured.len() as u32)
  }
}

impl<
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  M: Model<Output = D, Error = ME>,
  O: Render<D, Error = RE>,
> Task<M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: &M::Input, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始解析, 共 {} 次...", self.times);
    let mut times = Vec::with_capacity(self.times);
    let mut last = None;
    for i in 0..self.times {
      let now = std::time::Instant::now();
      let result = model.infer(input)?;
      let elapsed = now.elapsed();
      info!("({})解析完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    match self.average(&times) {
      Some(avg) => warn!("平均解析时间: {:.2?}", avg),
      None => warn!("解析次数不足 {} 次, 无法统计平均时间", self.warmup + 1),
    }

    if let Some(result) = last {
      output.render_result(&result)?;
    }

    Ok(())
  }
}
