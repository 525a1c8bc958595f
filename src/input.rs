// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/input.rs - 图像选择与摄像头输入
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

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use thiserror::Error;

use crate::FromUrl;

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{DirectoryReplayInput, ImageFileInput, ImageFileInputError};

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::{V4lInput, V4lInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L input error: {0}")]
  V4lInputError(#[from] V4lInputError),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image encoding error: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 用户选择的图片文件
///
/// 原样上传，不做解码或重新编码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
  bytes: Vec<u8>,
  filename: String,
  mime: String,
}

impl SelectedImage {
  pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
    let filename = filename.into();
    let mime = guess_mime(&filename).to_string();
    SelectedImage {
      bytes,
      filename,
      mime,
    }
  }

  pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let filename = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "image".to_string());
    Ok(SelectedImage::new(bytes, filename))
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn filename(&self) -> &str {
    &self.filename
  }

  pub fn mime(&self) -> &str {
    &self.mime
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

fn guess_mime(filename: &str) -> &'static str {
  ImageFormat::from_path(filename)
    .map(|format| format.to_mime_type())
    .unwrap_or("application/octet-stream")
}

/// 摄像头抓取的一帧（PNG 编码），提交后即丢弃
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
  png: Vec<u8>,
}

impl CapturedFrame {
  pub fn from_png(png: Vec<u8>) -> Self {
    CapturedFrame { png }
  }

  pub fn from_rgb(image: &RgbImage) -> Result<Self, InputError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(CapturedFrame {
      png: buffer.into_inner(),
    })
  }

  pub fn len(&self) -> usize {
    self.png.len()
  }

  pub fn is_empty(&self) -> bool {
    self.png.is_empty()
  }

  pub fn into_png(self) -> Vec<u8> {
    self.png
  }
}

/// 实时检测的帧来源
pub trait FrameSource: Send {
  /// 抓取一帧；`Ok(None)` 表示摄像头尚未就绪，本次跳过
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError> {
    (**self).capture()
  }
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "read_image_file")]
  DirectoryReplay(DirectoryReplayInput),
  #[cfg(feature = "v4l_input")]
  V4l(V4lInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        return Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?));
      }
      if url.scheme() == DirectoryReplayInput::SCHEME {
        return Ok(InputWrapper::DirectoryReplay(
          DirectoryReplayInput::from_url(url)?,
        ));
      }
    }
    #[cfg(feature = "v4l_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == V4lInput::SCHEME {
        return Ok(InputWrapper::V4l(V4lInput::from_url(url)?));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

impl FrameSource for InputWrapper {
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.capture(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::DirectoryReplay(input) => input.capture(),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.capture(),
      #[allow(unreachable_patterns)]
      _ => Ok(None),
    }
  }
}
