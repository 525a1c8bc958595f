// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/upload.rs - 上传检测面板
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

//! # 上传检测面板
//!
//! 面板实例持有自己的全部状态：已选图片、后端状态、提交中标志、
//! 最近一次结果与错误。
//!
//! - 挂载时探测一次后端（[`UploadPanel::mount`]），之后不再自动重新检查。
//! - 选择新图片总是清空结果和错误。
//! - 提交失败时保留上一次成功的结果，只更新错误信息。
//! - 提交中或后端不可达时，提交操作不可用。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::{DetectError, DetectRequest, DetectionClient};
use crate::input::SelectedImage;
use crate::result::DetectionResult;
use crate::status::BackendStatus;

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// 提交前置条件不满足时给用户的提示，此时不发送任何请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadWarning {
  Busy,
  NoImage,
  BackendDisconnected,
}

impl fmt::Display for UploadWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      UploadWarning::Busy => write!(f, "A detection request is already in progress."),
      UploadWarning::NoImage => write!(f, "Please select an image first!"),
      UploadWarning::BackendDisconnected => write!(
        f,
        "Backend server is not reachable. Please make sure it's running."
      ),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
  Detected(Arc<DetectionResult>),
  Rejected(UploadWarning),
  /// 需要以阻塞方式通知用户的失败
  Failed { message: String },
  /// 请求期间用户重新选择了图片，响应被丢弃
  Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct UploadState {
  pub selected: Option<SelectedImage>,
  pub result: Option<Arc<DetectionResult>>,
  pub error: Option<String>,
  pub submitting: bool,
  pub status: BackendStatus,
  /// 每次选择图片递增，用于识别过期的响应
  pub selection: u64,
}

impl UploadState {
  pub fn can_submit(&self) -> bool {
    !self.submitting && self.status.allows_submit()
  }
}

/// 无论成功、失败还是被取消，都会清除提交中标志
struct SubmittingGuard<'a> {
  state: &'a Mutex<UploadState>,
}

impl Drop for SubmittingGuard<'_> {
  fn drop(&mut self) {
    self.state.lock().submitting = false;
  }
}

pub struct UploadPanel {
  client: Arc<dyn DetectionClient>,
  timeout: Duration,
  state: Mutex<UploadState>,
}

impl UploadPanel {
  pub fn new(client: Arc<dyn DetectionClient>) -> Self {
    UploadPanel {
      client,
      timeout: DEFAULT_UPLOAD_TIMEOUT,
      state: Mutex::new(UploadState::default()),
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// 创建面板并探测一次后端
  pub async fn mount(client: Arc<dyn DetectionClient>, timeout: Duration) -> Self {
    let panel = UploadPanel::new(client).with_timeout(timeout);
    panel.probe().await;
    panel
  }

  pub async fn probe(&self) -> BackendStatus {
    self.state.lock().status = BackendStatus::Checking;

    let status = match self.client.probe().await {
      Ok(()) => {
        info!("后端连接正常");
        BackendStatus::Connected
      }
      Err(err) => {
        error!("后端连接失败: {}", err);
        BackendStatus::Disconnected
      }
    };

    self.state.lock().status = status;
    status
  }

  /// 替换已选图片，并清空之前的结果和错误
  pub fn select(&self, image: SelectedImage) {
    let mut state = self.state.lock();
    info!("选择图片: {} ({} 字节)", image.filename(), image.bytes().len());
    state.selected = Some(image);
    state.selection += 1;
    state.result = None;
    state.error = None;
  }

  pub async fn submit(&self) -> SubmitOutcome {
    let (request, selection) = {
      let mut state = self.state.lock();
      if state.submitting {
        return SubmitOutcome::Rejected(UploadWarning::Busy);
      }
      let Some(image) = state.selected.as_ref().filter(|image| !image.is_empty()) else {
        warn!("{}", UploadWarning::NoImage);
        return SubmitOutcome::Rejected(UploadWarning::NoImage);
      };
      if !state.status.allows_submit() {
        warn!("{}", UploadWarning::BackendDisconnected);
        return SubmitOutcome::Rejected(UploadWarning::BackendDisconnected);
      }

      let request = DetectRequest::from(image);
      state.submitting = true;
      state.error = None;
      (request, state.selection)
    };
    let guard = SubmittingGuard { state: &self.state };

    info!("上传图片: {}", request.filename);
    let now = std::time::Instant::now();
    let outcome = match tokio::time::timeout(self.timeout, self.client.detect(request)).await {
      Ok(outcome) => outcome,
      Err(_) => Err(DetectError::Timeout(self.timeout)),
    };

    let outcome = {
      let mut state = self.state.lock();
      if state.selection != selection {
        debug!("已重新选择图片，丢弃过期响应");
        drop(state);
        drop(guard);
        return SubmitOutcome::Superseded;
      }
      match outcome {
        Ok(result) => {
          info!("检测完成，耗时: {:.2?}", now.elapsed());
          let result = Arc::new(result);
          state.result = Some(Arc::clone(&result));
          state.error = None;
          SubmitOutcome::Detected(result)
        }
        Err(err) => {
          let message = err.user_message();
          error!("上传失败: {}", message);
          state.error = Some(message.clone());
          SubmitOutcome::Failed { message }
        }
      }
    };
    drop(guard);
    outcome
  }

  pub fn can_submit(&self) -> bool {
    self.state.lock().can_submit()
  }

  pub fn is_submitting(&self) -> bool {
    self.state.lock().submitting
  }

  pub fn status(&self) -> BackendStatus {
    self.state.lock().status
  }

  pub fn result(&self) -> Option<Arc<DetectionResult>> {
    self.state.lock().result.clone()
  }

  pub fn error(&self) -> Option<String> {
    self.state.lock().error.clone()
  }

  pub fn snapshot(&self) -> UploadState {
    self.state.lock().clone()
  }
}
