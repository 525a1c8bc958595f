// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::ImageFormat;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::Render,
  result::{DetectionResult, ResultError},
};

/// 每个新结果覆盖同一个文件
pub struct SaveImageFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("结果解码错误: {0}")]
  ResultError(#[from] ResultError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("不是本地文件路径: {0}")]
  InvalidPath(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = uri
      .to_file_path()
      .map_err(|_| SaveImageFileError::InvalidPath(uri.to_string()))?;
    Ok(SaveImageFileOutput { path })
  }
}

impl SaveImageFileOutput {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, result: &DetectionResult) -> Result<(), Self::Error> {
    let path = self.path.as_path();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    // PNG 直接写入服务端返回的字节，其他格式需要重新编码
    match ImageFormat::from_path(path) {
      Ok(ImageFormat::Png) | Err(_) => std::fs::write(path, result.png_bytes()?)?,
      Ok(_) => result.to_rgb_image()?.save(path)?,
    }

    info!("保存检测结果到文件: {}", self.path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use base64::{Engine as _, engine::general_purpose::STANDARD};
  use image::RgbImage;
  use std::io::Cursor;

  fn result() -> DetectionResult {
    let mut png = Cursor::new(Vec::new());
    RgbImage::from_pixel(3, 2, image::Rgb([255, 0, 0]))
      .write_to(&mut png, ImageFormat::Png)
      .unwrap();
    DetectionResult::new(STANDARD.encode(png.into_inner()))
  }

  #[test]
  fn png_is_written_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/result.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();

    let result = result();
    SaveImageFileOutput::from_url(&url)
      .unwrap()
      .render_result(&result)
      .unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), result.png_bytes().unwrap());
  }

  #[test]
  fn percent_encoded_path_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("my results/wall 1.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();

    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), path.as_path());
    output.render_result(&result()).unwrap();
    assert!(path.is_file());
  }

  #[test]
  fn jpeg_is_reencoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.jpg");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();

    SaveImageFileOutput::from_url(&url)
      .unwrap()
      .render_result(&result())
      .unwrap();
    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (3, 2));
  }
}
