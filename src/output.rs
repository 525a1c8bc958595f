// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/output.rs - 检测结果输出
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

use thiserror::Error;
use url::Url;

use crate::result::DetectionResult;
use crate::{FromUrl, FromUrlWithScheme};

pub trait Render: Sized {
  type Error;
  fn render_result(&self, result: &DetectionResult) -> Result<(), Self::Error>;
}

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 将结果以 data URI 的形式打印到标准输出
pub struct DataUriOutput;

impl FromUrlWithScheme for DataUriOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for DataUriOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(DataUriOutput)
  }
}

impl Render for DataUriOutput {
  type Error = OutputError;

  fn render_result(&self, result: &DetectionResult) -> Result<(), Self::Error> {
    println!("{}", result.data_uri());
    Ok(())
  }
}

pub enum OutputWrapper {
  DataUri(DataUriOutput),
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      DataUriOutput::SCHEME => Ok(OutputWrapper::DataUri(DataUriOutput::from_url(url)?)),
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &DetectionResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::DataUri(output) => output.render_result(result),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => {
        output.render_result(result).map_err(OutputError::from)
      }
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => {
        output.render_result(result).map_err(OutputError::from)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dispatches_by_scheme() {
    let url = Url::parse("stdout://").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Ok(OutputWrapper::DataUri(_))
    ));

    let url = Url::parse("rtsp://0.0.0.0:8554/live").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch)
    ));
  }
}
