// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/bin/probe.rs - 后端健康探测
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
  BackendStatus, ClientConfig, HttpDetectionClient,
  client::{BACKEND_URL_ENV, DEFAULT_BACKEND_URL},
  upload::UploadPanel,
};

/// StructScan 后端探测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测服务地址
  #[arg(long, value_name = "URL", env = BACKEND_URL_ENV, default_value = DEFAULT_BACKEND_URL)]
  pub backend: Url,
  /// 探测超时（秒）
  #[arg(long, value_name = "SECONDS", default_value_t = 5)]
  pub timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测服务地址: {}", args.backend);

  let mut config = ClientConfig::new(args.backend);
  config.probe_timeout = Duration::from_secs(args.timeout);
  let client = Arc::new(HttpDetectionClient::new(config)?);

  let panel = UploadPanel::new(client);
  let status = panel.probe().await;
  println!("{}", status);

  if status == BackendStatus::Disconnected {
    anyhow::bail!("后端不可达");
  }
  Ok(())
}
