// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/live.rs - 实时检测面板
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

//! # 实时检测面板
//!
//! 状态机只有 `Idle` 与 `Active` 两个状态。进入 `Active` 后按固定周期抓帧并提交：
//!
//! - 上一帧的请求还未完成时，本次抓取直接丢弃，不排队；
//! - 摄像头没有给出图像时，本次静默跳过；
//! - 每次启动/停止都会递增代数（generation），请求完成时代数不一致的结果被丢弃，
//!   因此停止之后到达的响应不会再显示；
//! - 停止或释放面板会立即取消定时任务，已发出的请求不会被中断。
//!
//! 面板必须在 tokio 运行时中启动。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{DetectError, DetectRequest, DetectionClient};
use crate::input::{CapturedFrame, FrameSource};
use crate::result::DetectionResult;

pub const DEFAULT_CAPTURE_PERIOD: Duration = Duration::from_secs(3);
pub const DEFAULT_LIVE_TIMEOUT: Duration = Duration::from_secs(10);

pub const FRAME_FAILURE: &str = "Failed to process frame";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveMode {
  Idle,
  Active,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveStats {
  /// 已发送的检测请求
  pub requests: u64,
  /// 因上一帧未完成而跳过的抓取
  pub skipped_busy: u64,
  /// 摄像头未就绪或抓取失败而跳过的抓取
  pub skipped_no_frame: u64,
  /// 停止后到达、被丢弃的响应
  pub discarded: u64,
  pub failures: u64,
}

struct LiveState {
  mode: LiveMode,
  generation: u64,
  in_flight: bool,
  result: Option<Arc<DetectionResult>>,
  error: Option<String>,
  stats: LiveStats,
}

struct LiveInner {
  client: Arc<dyn DetectionClient>,
  source: Mutex<Box<dyn FrameSource>>,
  timeout: Duration,
  state: Mutex<LiveState>,
  display: watch::Sender<Option<Arc<DetectionResult>>>,
}

/// 请求结束（包括任务被取消）时清除在途标志
struct InFlightGuard {
  inner: Arc<LiveInner>,
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.inner.state.lock().in_flight = false;
  }
}

impl LiveInner {
  fn is_current(state: &LiveState, generation: u64) -> bool {
    state.mode == LiveMode::Active && state.generation == generation
  }

  async fn tick(self: &Arc<Self>, generation: u64) {
    {
      let mut state = self.state.lock();
      if !Self::is_current(&state, generation) {
        return;
      }
      if state.in_flight {
        state.stats.skipped_busy += 1;
        debug!("上一帧仍在处理，跳过本次抓取");
        return;
      }
    }

    // 打开设备、等待一帧都可能阻塞，放到阻塞线程池中执行
    let inner = Arc::clone(self);
    let captured = tokio::task::spawn_blocking(move || inner.source.lock().capture()).await;
    let frame = match captured {
      Ok(Ok(Some(frame))) if !frame.is_empty() => frame,
      Ok(Ok(_)) => {
        self.state.lock().stats.skipped_no_frame += 1;
        debug!("摄像头未就绪，跳过本次抓取");
        return;
      }
      Ok(Err(err)) => {
        self.state.lock().stats.skipped_no_frame += 1;
        warn!("抓取图像失败: {}", err);
        return;
      }
      Err(err) => {
        self.state.lock().stats.skipped_no_frame += 1;
        warn!("抓取任务异常退出: {}", err);
        return;
      }
    };

    {
      let mut state = self.state.lock();
      if !Self::is_current(&state, generation) {
        return;
      }
      state.in_flight = true;
      state.error = None;
      state.stats.requests += 1;
    }

    let guard = InFlightGuard {
      inner: Arc::clone(self),
    };
    tokio::spawn(async move {
      guard.inner.submit(frame, generation).await;
      drop(guard);
    });
  }

  async fn submit(&self, frame: CapturedFrame, generation: u64) {
    debug!("提交第 {} 代的帧 ({} 字节)", generation, frame.len());
    let now = std::time::Instant::now();
    let request = DetectRequest::from(frame);
    let outcome = match tokio::time::timeout(self.timeout, self.client.detect(request)).await {
      Ok(outcome) => outcome,
      Err(_) => Err(DetectError::Timeout(self.timeout)),
    };

    let mut state = self.state.lock();
    if !Self::is_current(&state, generation) {
      state.stats.discarded += 1;
      debug!("面板已停止或重新启动，丢弃过期结果");
      return;
    }

    match outcome {
      Ok(result) => {
        debug!("帧处理完成，耗时: {:.2?}", now.elapsed());
        let result = Arc::new(result);
        state.result = Some(Arc::clone(&result));
        state.error = None;
        self.display.send_replace(Some(result));
      }
      Err(err) => {
        state.stats.failures += 1;
        warn!("帧处理失败: {}", err);
        state.error = Some(format!("{}: {}", FRAME_FAILURE, err.user_message()));
      }
    }
  }
}

pub struct LivePanel {
  inner: Arc<LiveInner>,
  period: Duration,
  ticker: Option<JoinHandle<()>>,
}

impl LivePanel {
  pub fn new(client: Arc<dyn DetectionClient>, source: Box<dyn FrameSource>) -> Self {
    Self::with_timing(client, source, DEFAULT_CAPTURE_PERIOD, DEFAULT_LIVE_TIMEOUT)
  }

  pub fn with_timing(
    client: Arc<dyn DetectionClient>,
    source: Box<dyn FrameSource>,
    period: Duration,
    timeout: Duration,
  ) -> Self {
    let (display, _) = watch::channel(None);
    LivePanel {
      inner: Arc::new(LiveInner {
        client,
        source: Mutex::new(source),
        timeout,
        state: Mutex::new(LiveState {
          mode: LiveMode::Idle,
          generation: 0,
          in_flight: false,
          result: None,
          error: None,
          stats: LiveStats::default(),
        }),
        display,
      }),
      period,
      ticker: None,
    }
  }

  /// Idle → Active：清空显示，一个周期后第一次抓取
  pub fn start(&mut self) {
    let generation = {
      let mut state = self.inner.state.lock();
      if state.mode == LiveMode::Active {
        return;
      }
      state.mode = LiveMode::Active;
      state.generation += 1;
      state.result = None;
      state.generation
    };
    self.inner.display.send_replace(None);
    info!("开始实时检测，周期 {:?}", self.period);

    let inner = Arc::clone(&self.inner);
    let period = self.period;
    self.ticker = Some(tokio::spawn(async move {
      let mut interval = tokio::time::interval_at(Instant::now() + period, period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        interval.tick().await;
        inner.tick(generation).await;
      }
    }));
  }

  /// Active → Idle：取消定时任务并清空显示
  pub fn stop(&mut self) {
    if let Some(ticker) = self.ticker.take() {
      ticker.abort();
    }

    {
      let mut state = self.inner.state.lock();
      if state.mode == LiveMode::Idle {
        return;
      }
      state.mode = LiveMode::Idle;
      state.generation += 1;
      state.result = None;
    }
    self.inner.display.send_replace(None);
    info!("停止实时检测");
  }

  pub fn toggle(&mut self) -> LiveMode {
    match self.mode() {
      LiveMode::Idle => self.start(),
      LiveMode::Active => self.stop(),
    }
    self.mode()
  }

  /// 订阅当前显示的结果；启动、停止时为 `None`
  pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DetectionResult>>> {
    self.inner.display.subscribe()
  }

  pub fn mode(&self) -> LiveMode {
    self.inner.state.lock().mode
  }

  pub fn is_active(&self) -> bool {
    self.mode() == LiveMode::Active
  }

  /// 是否有请求在途
  pub fn is_processing(&self) -> bool {
    self.inner.state.lock().in_flight
  }

  pub fn result(&self) -> Option<Arc<DetectionResult>> {
    self.inner.state.lock().result.clone()
  }

  pub fn error(&self) -> Option<String> {
    self.inner.state.lock().error.clone()
  }

  pub fn stats(&self) -> LiveStats {
    self.inner.state.lock().stats
  }
}

impl Drop for LivePanel {
  fn drop(&mut self) {
    if let Some(ticker) = self.ticker.take() {
      ticker.abort();
    }
    let mut state = self.inner.state.lock();
    state.mode = LiveMode::Idle;
    state.generation += 1;
  }
}
