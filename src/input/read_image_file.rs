// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入（模拟摄像头）
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

use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use super::{CapturedFrame, FrameSource, InputError};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Not a directory: {0}")]
  NotADirectory(String),
  #[error("Not a local file path: {0}")]
  InvalidPath(String),
}

fn load_frame(path: &Path) -> Result<CapturedFrame, InputError> {
  let image = ImageReader::open(path)
    .map_err(ImageFileInputError::from)?
    .with_guessed_format()
    .map_err(ImageFileInputError::from)?
    .decode()
    .map_err(ImageFileInputError::from)?
    .to_rgb8();
  CapturedFrame::from_rgb(&image)
}

fn check_scheme(url: &Url, scheme: &str) -> Result<(), ImageFileInputError> {
  if url.scheme() != scheme {
    error!(
      "URI scheme mismatch: expected '{}', found '{}'",
      scheme,
      url.scheme()
    );
    return Err(ImageFileInputError::SchemaMismatch);
  }
  Ok(())
}

// 路径中的百分号编码需要先解码
fn file_path(url: &Url) -> Result<PathBuf, ImageFileInputError> {
  url
    .to_file_path()
    .map_err(|_| ImageFileInputError::InvalidPath(url.to_string()))
}

/// 单张图片，每次抓取都返回同一帧
pub struct ImageFileInput {
  frame: CapturedFrame,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    let frame = load_frame(&file_path(url)?)?;
    Ok(ImageFileInput { frame })
  }
}

impl FrameSource for ImageFileInput {
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError> {
    Ok(Some(self.frame.clone()))
  }
}

/// 按文件名顺序循环回放目录中的图片
pub struct DirectoryReplayInput {
  files: Vec<PathBuf>,
  next: usize,
}

impl FromUrlWithScheme for DirectoryReplayInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryReplayInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    Ok(DirectoryReplayInput::new(file_path(url)?)?)
  }
}

impl DirectoryReplayInput {
  pub fn new(directory: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
      return Err(ImageFileInputError::NotADirectory(
        directory.display().to_string(),
      ));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if path.is_file() && ImageFormat::from_path(&path).is_ok() {
        files.push(path);
      }
    }
    files.sort();

    if files.is_empty() {
      warn!("目录中没有图片: {}", directory.display());
    }
    Ok(DirectoryReplayInput { files, next: 0 })
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl FrameSource for DirectoryReplayInput {
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError> {
    if self.files.is_empty() {
      return Ok(None);
    }
    let path = &self.files[self.next];
    self.next = (self.next + 1) % self.files.len();
    debug!("回放图片: {}", path.display());
    load_frame(path).map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  fn write_image(path: &Path, width: u32) {
    RgbImage::new(width, 2).save(path).unwrap();
  }

  #[test]
  fn still_image_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wall.png");
    write_image(&path, 3);

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let first = input.capture().unwrap().unwrap();
    let second = input.capture().unwrap().unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());
  }

  #[test]
  fn directory_replays_in_name_order_and_wraps() {
    let dir = tempfile::tempdir().unwrap();
    write_image(&dir.path().join("b.png"), 2);
    write_image(&dir.path().join("a.png"), 1);
    std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

    let mut input = DirectoryReplayInput::new(dir.path()).unwrap();
    assert_eq!(input.len(), 2);

    let decode = |frame: CapturedFrame| {
      image::load_from_memory(&frame.into_png())
        .unwrap()
        .to_rgb8()
        .width()
    };
    assert_eq!(decode(input.capture().unwrap().unwrap()), 1);
    assert_eq!(decode(input.capture().unwrap().unwrap()), 2);
    assert_eq!(decode(input.capture().unwrap().unwrap()), 1);
  }

  #[test]
  fn empty_directory_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = DirectoryReplayInput::new(dir.path()).unwrap();
    assert!(input.capture().unwrap().is_none());
  }

  #[test]
  fn percent_encoded_paths_are_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("site photos");
    std::fs::create_dir(&folder).unwrap();
    let path = folder.join("my wall.png");
    write_image(&path, 3);

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    assert!(url.path().contains("%20"));
    let mut input = ImageFileInput::from_url(&url).unwrap();
    assert!(input.capture().unwrap().is_some());

    let url = Url::parse(&format!("folder://{}", folder.display())).unwrap();
    let input = DirectoryReplayInput::from_url(&url).unwrap();
    assert_eq!(input.len(), 1);
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(ImageFileInput::from_url(&url).is_err());
  }
}
