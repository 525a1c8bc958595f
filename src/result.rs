// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/result.rs - 检测结果
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

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use serde_json::{Map, Value};
use thiserror::Error;

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

const IMAGE_FIELD: &str = "image";
const ERROR_FIELD: &str = "error";

#[derive(Error, Debug)]
pub enum ResultError {
  #[error("Invalid JSON response: {0}")]
  InvalidJson(#[from] serde_json::Error),
  #[error("Response body is not a JSON object")]
  NotAnObject,
  #[error("Response has no image field")]
  MissingImage,
  #[error("Invalid base64 image: {0}")]
  Base64(#[from] base64::DecodeError),
  #[error("Image decoding error: {0}")]
  Image(#[from] image::ImageError),
}

/// 检测结果：服务端标注后的 PNG（base64）以及其余元数据
///
/// 每次新结果整体替换旧结果，不做合并。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
  image: String,
  metadata: Map<String, Value>,
}

impl DetectionResult {
  pub fn new(image_base64: impl Into<String>) -> Self {
    Self {
      image: image_base64.into(),
      metadata: Map::new(),
    }
  }

  pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
    self.metadata = metadata;
    self
  }

  /// 解析 `{ "image": "<base64>", ... }` 形式的响应体
  ///
  /// `image` 之外的字段原样保留为元数据。
  pub fn from_json(body: &[u8]) -> Result<Self, ResultError> {
    let mut object = match serde_json::from_slice::<Value>(body)? {
      Value::Object(object) => object,
      _ => return Err(ResultError::NotAnObject),
    };

    match object.remove(IMAGE_FIELD) {
      Some(Value::String(image)) => Ok(Self {
        image,
        metadata: object,
      }),
      _ => Err(ResultError::MissingImage),
    }
  }

  pub fn image_base64(&self) -> &str {
    &self.image
  }

  pub fn metadata(&self) -> &Map<String, Value> {
    &self.metadata
  }

  /// 用于显示的 data URI，base64 部分与服务端返回的完全一致
  pub fn data_uri(&self) -> String {
    format!("{}{}", PNG_DATA_URI_PREFIX, self.image)
  }

  pub fn png_bytes(&self) -> Result<Vec<u8>, ResultError> {
    Ok(STANDARD.decode(self.image.as_bytes())?)
  }

  pub fn to_rgb_image(&self) -> Result<RgbImage, ResultError> {
    let bytes = self.png_bytes()?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
    Ok(image.to_rgb8())
  }
}

/// 从错误响应体中取出 `error` 字段
pub fn error_message(body: &[u8]) -> Option<String> {
  match serde_json::from_slice::<Value>(body).ok()? {
    Value::Object(mut object) => match object.remove(ERROR_FIELD)? {
      Value::String(message) if !message.trim().is_empty() => Some(message),
      _ => None,
    },
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  fn tiny_png() -> Vec<u8> {
    let image = RgbImage::from_pixel(2, 3, image::Rgb([0, 255, 0]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
  }

  #[test]
  fn data_uri_is_prefix_plus_exact_payload() {
    let result = DetectionResult::from_json(br#"{"image":"iVBORw0KGgo="}"#).unwrap();
    assert_eq!(result.image_base64(), "iVBORw0KGgo=");
    assert_eq!(result.data_uri(), "data:image/png;base64,iVBORw0KGgo=");
  }

  #[test]
  fn extra_fields_become_metadata() {
    let body = br#"{"image":"AAAA","risk":"high","boxes":2}"#;
    let result = DetectionResult::from_json(body).unwrap();
    assert_eq!(result.metadata().len(), 2);
    assert_eq!(result.metadata()["risk"], "high");
    assert!(!result.metadata().contains_key("image"));
  }

  #[test]
  fn missing_or_non_string_image_is_an_error() {
    assert!(matches!(
      DetectionResult::from_json(br#"{"status":"ok"}"#),
      Err(ResultError::MissingImage)
    ));
    assert!(matches!(
      DetectionResult::from_json(br#"{"image":42}"#),
      Err(ResultError::MissingImage)
    ));
    assert!(matches!(
      DetectionResult::from_json(b"[1,2]"),
      Err(ResultError::NotAnObject)
    ));
    assert!(matches!(
      DetectionResult::from_json(b"<html>"),
      Err(ResultError::InvalidJson(_))
    ));
  }

  #[test]
  fn decodes_annotated_png() {
    let encoded = STANDARD.encode(tiny_png());
    let result = DetectionResult::new(encoded);
    let image = result.to_rgb_image().unwrap();
    assert_eq!(image.dimensions(), (2, 3));
    assert_eq!(image.get_pixel(1, 2).0, [0, 255, 0]);
  }

  #[test]
  fn invalid_base64_is_reported_on_decode() {
    let result = DetectionResult::new("not base64!");
    assert!(matches!(result.png_bytes(), Err(ResultError::Base64(_))));
  }

  #[test]
  fn error_field_is_extracted() {
    assert_eq!(
      error_message(br#"{"error":"Invalid image file"}"#).as_deref(),
      Some("Invalid image file")
    );
    assert_eq!(error_message(br#"{"error":""}"#), None);
    assert_eq!(error_message(b"Internal Server Error"), None);
  }
}
