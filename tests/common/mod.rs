// 该文件是 StructScan （结构扫描） 项目的一部分。
// tests/common/mod.rs - 测试用检测服务与帧来源
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

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use structscan::input::{CapturedFrame, FrameSource, InputError};
use structscan::{DetectError, DetectRequest, DetectionClient, DetectionResult};

#[derive(Debug, Clone)]
pub enum Reply {
  Ok(DetectionResult),
  Err(DetectError),
  /// 永不返回
  Pending,
  After(Duration, Box<Reply>),
}

impl Reply {
  pub fn image(base64: &str) -> Reply {
    Reply::Ok(DetectionResult::new(base64))
  }

  pub fn after(delay: Duration, reply: Reply) -> Reply {
    Reply::After(delay, Box::new(reply))
  }
}

struct Leave<'a>(&'a AtomicUsize);

impl Drop for Leave<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

/// 按脚本应答的检测服务
pub struct FakeClient {
  probe_ok: bool,
  replies: Mutex<VecDeque<Reply>>,
  fallback: Reply,
  probes: AtomicUsize,
  calls: AtomicUsize,
  in_flight: AtomicUsize,
  max_in_flight: AtomicUsize,
  requests: Mutex<Vec<DetectRequest>>,
}

impl FakeClient {
  pub fn new(probe_ok: bool, fallback: Reply) -> Arc<Self> {
    Arc::new(FakeClient {
      probe_ok,
      replies: Mutex::new(VecDeque::new()),
      fallback,
      probes: AtomicUsize::new(0),
      calls: AtomicUsize::new(0),
      in_flight: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
      requests: Mutex::new(Vec::new()),
    })
  }

  pub fn connected(fallback: Reply) -> Arc<Self> {
    FakeClient::new(true, fallback)
  }

  pub fn then(self: &Arc<Self>, reply: Reply) -> Arc<Self> {
    self.replies.lock().push_back(reply);
    Arc::clone(self)
  }

  pub fn probes(&self) -> usize {
    self.probes.load(Ordering::SeqCst)
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn in_flight(&self) -> usize {
    self.in_flight.load(Ordering::SeqCst)
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }

  pub fn requests(&self) -> Vec<DetectRequest> {
    self.requests.lock().clone()
  }
}

#[async_trait]
impl DetectionClient for FakeClient {
  async fn probe(&self) -> Result<(), DetectError> {
    self.probes.fetch_add(1, Ordering::SeqCst);
    if self.probe_ok {
      Ok(())
    } else {
      Err(DetectError::Network("connection refused".to_string()))
    }
  }

  async fn detect(&self, request: DetectRequest) -> Result<DetectionResult, DetectError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    let _leave = Leave(&self.in_flight);
    self.requests.lock().push(request);

    let mut reply = self
      .replies
      .lock()
      .pop_front()
      .unwrap_or_else(|| self.fallback.clone());
    loop {
      match reply {
        Reply::Ok(result) => return Ok(result),
        Reply::Err(err) => return Err(err),
        Reply::Pending => return std::future::pending().await,
        Reply::After(delay, next) => {
          tokio::time::sleep(delay).await;
          reply = *next;
        }
      }
    }
  }
}

/// 模拟摄像头；`ready` 为假时不给出图像
pub struct FakeSource {
  ready: bool,
  captures: Arc<AtomicUsize>,
}

impl FakeSource {
  pub fn ready() -> (Self, Arc<AtomicUsize>) {
    FakeSource::with_ready(true)
  }

  pub fn not_ready() -> (Self, Arc<AtomicUsize>) {
    FakeSource::with_ready(false)
  }

  fn with_ready(ready: bool) -> (Self, Arc<AtomicUsize>) {
    let captures = Arc::new(AtomicUsize::new(0));
    (
      FakeSource {
        ready,
        captures: Arc::clone(&captures),
      },
      captures,
    )
  }
}

impl FrameSource for FakeSource {
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError> {
    let index = self.captures.fetch_add(1, Ordering::SeqCst);
    if !self.ready {
      return Ok(None);
    }
    Ok(Some(CapturedFrame::from_png(
      format!("frame-{}", index).into_bytes(),
    )))
  }
}
