// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/input/v4l_input.rs - V4L 摄像头输入
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

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;

use super::{CapturedFrame, FrameSource, InputError};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("V4L error: {0}")]
  V4lError(#[from] std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
  #[error("Frame decoding error: {0}")]
  DecodeError(#[from] image::ImageError),
}

const DEFAULT_DEVICE: &str = "/dev/video0";
const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;

/// V4L 摄像头
///
/// 每次抓取时打开设备、取一帧后释放，不在两次抓取之间占用采集流。
pub struct V4lInput {
  device_path: String,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch.into());
    }

    // v4l:///dev/video0
    let device_path = if url.path().is_empty() || url.path() == "/" {
      DEFAULT_DEVICE.to_string()
    } else {
      url.path().to_string()
    };

    // 先打开一次，确认设备存在
    let device = v4l::Device::with_path(&device_path).map_err(V4lInputError::from)?;
    let format = device.format().map_err(V4lInputError::from)?;
    debug!(
      "摄像头 {} 当前格式: {}x{} {}",
      device_path, format.width, format.height, format.fourcc
    );

    Ok(V4lInput { device_path })
  }
}

impl V4lInput {
  fn capture_frame(&self) -> Result<RgbImage, V4lInputError> {
    let device = v4l::Device::with_path(&self.device_path)?;

    let mut format = device.format()?;
    format.width = CAPTURE_WIDTH;
    format.height = CAPTURE_HEIGHT;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;

    let mut stream = Stream::with_buffers(&device, Type::VideoCapture, 4)?;
    let (buffer, _meta) = stream.next()?;

    if format.fourcc == FourCC::new(b"YUYV") {
      let rgb = yuyv_to_rgb(buffer);
      return RgbImage::from_raw(format.width, format.height, rgb).ok_or_else(|| {
        V4lInputError::UnsupportedPixelFormat("YUYV buffer size mismatch".to_string())
      });
    }
    if format.fourcc == FourCC::new(b"MJPG") {
      let image = image::load_from_memory_with_format(buffer, ImageFormat::Jpeg)?;
      return Ok(image.to_rgb8());
    }
    Err(V4lInputError::UnsupportedPixelFormat(
      format.fourcc.to_string(),
    ))
  }
}

impl FrameSource for V4lInput {
  fn capture(&mut self) -> Result<Option<CapturedFrame>, InputError> {
    let image = self.capture_frame()?;
    CapturedFrame::from_rgb(&image).map(Some)
  }
}

/// YUYV 转 RGB，每 4 字节两个像素
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
  let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);

  for chunk in yuyv.chunks_exact(4) {
    let u = chunk[1] as f32 - 128.0;
    let v = chunk[3] as f32 - 128.0;

    for y in [chunk[0] as f32, chunk[2] as f32] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grey_yuyv_stays_grey() {
    let rgb = yuyv_to_rgb(&[128, 128, 64, 128]);
    assert_eq!(rgb, vec![128, 128, 128, 64, 64, 64]);
  }

  #[test]
  fn trailing_bytes_are_ignored() {
    assert_eq!(yuyv_to_rgb(&[0, 128, 0, 128, 7]).len(), 6);
  }
}
