// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/bin/live.rs - 摄像头实时检测
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

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use structscan::{
  ClientConfig, FromUrl, HttpDetectionClient, about,
  client::{BACKEND_URL_ENV, DEFAULT_BACKEND_URL},
  input::InputWrapper,
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};

/// StructScan 实时检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测服务地址
  #[arg(long, value_name = "URL", env = BACKEND_URL_ENV, default_value = DEFAULT_BACKEND_URL)]
  pub backend: Url,
  /// 输入来源
  /// 支持格式:
  /// - v4l:///dev/video0（需要 v4l_input 特性）
  /// - image:///path/still.jpg
  /// - folder:///path/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "stdout://")]
  pub output: Url,
  /// 抓帧周期（秒）
  #[arg(long, value_name = "SECONDS", default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
  pub period: u64,
  /// 单帧请求超时（秒）
  #[arg(long, value_name = "SECONDS", default_value_t = 10)]
  pub timeout: u64,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  about::print_banner();

  info!("检测服务地址: {}", args.backend);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let client = Arc::new(HttpDetectionClient::new(ClientConfig::new(args.backend))?);
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_period(Duration::from_secs(args.period))
    .with_timeout(Duration::from_secs(args.timeout))
    .run_task(client, input, output)
    .await?;

  about::print_footer();
  Ok(())
}
