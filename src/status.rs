// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/status.rs - 后端连接状态
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

use std::fmt;

/// 后端连接状态
///
/// 上传面板挂载时探测一次，之后不再自动重新检查。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendStatus {
  /// 探测尚未完成
  #[default]
  Checking,
  /// 探测成功
  Connected,
  /// 探测失败（网络错误、非 2xx、超时）
  Disconnected,
}

impl BackendStatus {
  pub fn allows_submit(&self) -> bool {
    !matches!(self, BackendStatus::Disconnected)
  }
}

impl fmt::Display for BackendStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BackendStatus::Checking => write!(f, "Checking backend connection..."),
      BackendStatus::Connected => write!(f, "✓ Backend connected"),
      BackendStatus::Disconnected => write!(
        f,
        "⚠ Backend server is not reachable. Make sure it is running."
      ),
    }
  }
}
