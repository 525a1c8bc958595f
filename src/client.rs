// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/client.rs - 检测服务客户端
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

//! # 检测服务客户端
//!
//! 外部检测服务只有两个接口：
//!
//! | 操作 | 方法与路径 | 请求 | 响应 |
//! |---|---|---|---|
//! | 健康探测 | `GET /test` | 无 | 任意 2xx |
//! | 检测 | `POST /upload` | multipart，字段 `file` | `{ "image": <base64 PNG>, ... }` |
//!
//! 超时由调用方（上传面板 / 实时面板）控制，这里只设置连接超时。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::input::{CapturedFrame, SelectedImage};
use crate::result::{DetectionResult, ResultError, error_message};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
pub const BACKEND_URL_ENV: &str = "STRUCTSCAN_BACKEND";

pub const TEST_PATH: &str = "test";
pub const UPLOAD_PATH: &str = "upload";
pub const FILE_FIELD: &str = "file";
pub const LIVE_FILENAME: &str = "webcam.png";

pub const GENERIC_FAILURE: &str = "Failed to upload image. Please try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
  #[error("timeout of {}ms exceeded", .0.as_millis())]
  Timeout(Duration),
  #[error("{0}")]
  Network(String),
  #[error("Request failed with status code {status}")]
  Status { status: u16, message: Option<String> },
  #[error("Malformed response: {0}")]
  Malformed(String),
  #[error("Response did not contain an annotated image")]
  MissingImage,
  #[error("Invalid endpoint URL: {0}")]
  InvalidUrl(String),
}

impl DetectError {
  /// 面向用户的错误信息
  ///
  /// 优先使用响应体中的 `error` 字段，其次是传输错误本身，最后是通用提示。
  pub fn user_message(&self) -> String {
    if let DetectError::Status {
      message: Some(message),
      ..
    } = self
    {
      return message.clone();
    }
    let message = self.to_string();
    if message.trim().is_empty() {
      GENERIC_FAILURE.to_string()
    } else {
      message
    }
  }
}

impl From<reqwest::Error> for DetectError {
  fn from(err: reqwest::Error) -> Self {
    DetectError::Network(err.to_string())
  }
}

impl From<ResultError> for DetectError {
  fn from(err: ResultError) -> Self {
    match err {
      ResultError::MissingImage => DetectError::MissingImage,
      other => DetectError::Malformed(other.to_string()),
    }
  }
}

impl From<url::ParseError> for DetectError {
  fn from(err: url::ParseError) -> Self {
    DetectError::InvalidUrl(err.to_string())
  }
}

/// 一次检测请求：multipart 字段 `file` 的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectRequest {
  pub bytes: Vec<u8>,
  pub filename: String,
  pub mime: String,
}

impl From<&SelectedImage> for DetectRequest {
  fn from(image: &SelectedImage) -> Self {
    DetectRequest {
      bytes: image.bytes().to_vec(),
      filename: image.filename().to_string(),
      mime: image.mime().to_string(),
    }
  }
}

impl From<CapturedFrame> for DetectRequest {
  fn from(frame: CapturedFrame) -> Self {
    DetectRequest {
      bytes: frame.into_png(),
      filename: LIVE_FILENAME.to_string(),
      mime: "image/png".to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub base_url: Url,
  pub connect_timeout: Duration,
  pub probe_timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    ClientConfig {
      base_url: Url::parse(DEFAULT_BACKEND_URL).expect("default backend URL is valid"),
      connect_timeout: Duration::from_secs(5),
      probe_timeout: Duration::from_secs(5),
    }
  }
}

impl ClientConfig {
  pub fn new(base_url: Url) -> Self {
    ClientConfig {
      base_url,
      ..Default::default()
    }
  }

  /// 在基础地址的路径后追加接口名，保留基础地址自身的路径前缀
  pub fn endpoint(&self, name: &str) -> Url {
    let mut url = self.base_url.clone();
    let path = format!("{}/{}", url.path().trim_end_matches('/'), name);
    url.set_path(&path);
    url
  }
}

#[async_trait]
pub trait DetectionClient: Send + Sync {
  /// 健康探测，任意 2xx 视为成功
  async fn probe(&self) -> Result<(), DetectError>;

  /// 提交图像，返回标注后的结果
  async fn detect(&self, request: DetectRequest) -> Result<DetectionResult, DetectError>;
}

pub struct HttpDetectionClient {
  config: ClientConfig,
  http: reqwest::Client,
}

impl HttpDetectionClient {
  pub fn new(config: ClientConfig) -> Result<Self, DetectError> {
    let http = reqwest::Client::builder()
      .connect_timeout(config.connect_timeout)
      .build()?;
    Ok(HttpDetectionClient { config, http })
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }
}

#[async_trait]
impl DetectionClient for HttpDetectionClient {
  async fn probe(&self) -> Result<(), DetectError> {
    let url = self.config.endpoint(TEST_PATH);
    debug!("探测后端: {}", url);
    let response = self
      .http
      .get(url)
      .timeout(self.config.probe_timeout)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.bytes().await.unwrap_or_default();
      return Err(DetectError::Status {
        status: status.as_u16(),
        message: error_message(&body),
      });
    }
    info!("后端可达: {}", self.config.base_url);
    Ok(())
  }

  async fn detect(&self, request: DetectRequest) -> Result<DetectionResult, DetectError> {
    let url = self.config.endpoint(UPLOAD_PATH);
    debug!(
      "发送检测请求: {} ({}, {} 字节)",
      url,
      request.filename,
      request.bytes.len()
    );

    let part = Part::bytes(request.bytes)
      .file_name(request.filename)
      .mime_str(&request.mime)?;
    let form = Form::new().part(FILE_FIELD, part);

    let response = self.http.post(url).multipart(form).send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
      return Err(DetectError::Status {
        status: status.as_u16(),
        message: error_message(&body),
      });
    }

    Ok(DetectionResult::from_json(&body)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn endpoint_keeps_base_path() {
    let config = ClientConfig::new(Url::parse("http://10.0.0.2:5001/api/").unwrap());
    assert_eq!(
      config.endpoint(UPLOAD_PATH).as_str(),
      "http://10.0.0.2:5001/api/upload"
    );

    let config = ClientConfig::default();
    assert_eq!(config.endpoint(TEST_PATH).as_str(), "http://localhost:5001/test");
  }

  #[test]
  fn user_message_prefers_body_error() {
    let err = DetectError::Status {
      status: 400,
      message: Some("No file provided".to_string()),
    };
    assert_eq!(err.user_message(), "No file provided");

    let err = DetectError::Status {
      status: 502,
      message: None,
    };
    assert_eq!(err.user_message(), "Request failed with status code 502");

    let err = DetectError::Timeout(Duration::from_secs(30));
    assert_eq!(err.user_message(), "timeout of 30000ms exceeded");

    assert_eq!(
      DetectError::Network(String::new()).user_message(),
      GENERIC_FAILURE
    );
  }

  #[test]
  fn missing_image_keeps_its_own_kind() {
    assert_eq!(
      DetectError::from(ResultError::MissingImage),
      DetectError::MissingImage
    );
    assert!(matches!(
      DetectError::from(ResultError::NotAnObject),
      DetectError::Malformed(_)
    ));
  }
}
