// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/task.rs - 上传与实时检测任务
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

use std::future::Future;
use std::sync::Arc;
use std::{thread, time::Duration};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::client::DetectionClient;
use crate::input::{FrameSource, SelectedImage};
use crate::live::{DEFAULT_CAPTURE_PERIOD, DEFAULT_LIVE_TIMEOUT, LivePanel};
use crate::output::Render;
use crate::status::BackendStatus;
use crate::upload::{DEFAULT_UPLOAD_TIMEOUT, SubmitOutcome, UploadPanel};

#[async_trait]
pub trait Task<I, O>: Sized {
  type Error;
  async fn run_task(
    self,
    client: Arc<dyn DetectionClient>,
    input: I,
    output: O,
  ) -> Result<(), Self::Error>;
}

/// 上传一张图片：探测后端、选择、提交、输出
#[derive(Debug)]
pub struct OneShotTask {
  timeout: Duration,
}

impl Default for OneShotTask {
  fn default() -> Self {
    OneShotTask {
      timeout: DEFAULT_UPLOAD_TIMEOUT,
    }
  }
}

impl OneShotTask {
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }
}

#[async_trait]
impl<RE, O> Task<SelectedImage, O> for OneShotTask
where
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<Error = RE> + Send + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(
    self,
    client: Arc<dyn DetectionClient>,
    input: SelectedImage,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let panel = UploadPanel::mount(client, self.timeout).await;
    match panel.status() {
      BackendStatus::Disconnected => warn!("{}", panel.status()),
      status => info!("{}", status),
    }

    panel.select(input);
    let now = std::time::Instant::now();
    match panel.submit().await {
      SubmitOutcome::Detected(result) => {
        info!("检测完成，耗时: {:.2?}", now.elapsed());
        output.render_result(&result)?;
        info!("渲染完成");
        Ok(())
      }
      SubmitOutcome::Rejected(warning) => Err(anyhow::anyhow!("{}", warning)),
      SubmitOutcome::Failed { message } => Err(anyhow::anyhow!("Error: {}", message)),
      SubmitOutcome::Superseded => Err(anyhow::anyhow!("图片已重新选择，结果被丢弃")),
    }
  }
}

/// 实时检测：按周期抓帧，直到中断或达到指定结果数
#[derive(Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  period: Duration,
  timeout: Duration,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    ContinuousTask {
      frame_number: None,
      period: DEFAULT_CAPTURE_PERIOD,
      timeout: DEFAULT_LIVE_TIMEOUT,
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_period(mut self, period: Duration) -> Self {
    self.period = period;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// 运行直到 `shutdown` 完成或达到指定结果数，返回渲染的结果数
  pub async fn run_until<I, O, RE>(
    self,
    client: Arc<dyn DetectionClient>,
    input: I,
    output: O,
    shutdown: impl Future<Output = ()>,
  ) -> anyhow::Result<usize>
  where
    I: FrameSource + 'static,
    RE: std::error::Error + Sync + Send + 'static,
    O: Render<Error = RE>,
  {
    let mut panel = LivePanel::with_timing(client, Box::new(input), self.period, self.timeout);
    let mut display = panel.subscribe();
    panel.start();

    tokio::pin!(shutdown);
    let mut rendered = 0usize;
    let outcome = loop {
      tokio::select! {
        _ = &mut shutdown => {
          warn!("中断信号接收，退出任务循环");
          break Ok(rendered);
        }
        changed = display.changed() => {
          if changed.is_err() {
            break Ok(rendered);
          }
          let Some(result) = display.borrow_and_update().clone() else {
            continue;
          };
          rendered += 1;
          info!("渲染第 {} 个检测结果", rendered);
          if let Err(err) = output.render_result(&result) {
            break Err(anyhow::Error::from(err));
          }
          if self.frame_number.map(|n| rendered >= n).unwrap_or(false) {
            info!("达到指定帧数 {}, 退出任务循环", rendered);
            break Ok(rendered);
          }
        }
      }
    };

    panel.stop();
    let stats = panel.stats();
    info!(
      "请求 {} 次，跳过 {} 次（忙） / {} 次（无图像），失败 {} 次，丢弃 {} 次",
      stats.requests, stats.skipped_busy, stats.skipped_no_frame, stats.failures, stats.discarded
    );
    outcome
  }
}

#[async_trait]
impl<I, O, RE> Task<I, O> for ContinuousTask
where
  I: FrameSource + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<Error = RE> + Send + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(
    self,
    client: Arc<dyn DetectionClient>,
    input: I,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupt = Arc::new(Notify::new());
    let notifier = Arc::clone(&interrupt);

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      notifier.notify_one();
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let rendered = self
      .run_until(client, input, output, async move {
        interrupt.notified().await;
      })
      .await?;

    info!("任务完成，共 {} 个结果", rendered);
    Ok(())
  }
}
