// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::Render,
  result::{DetectionResult, ResultError},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("不是本地目录路径: {0}")]
  InvalidPath(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("结果解码错误: {0}")]
  ResultError(#[from] ResultError),
  #[error("元数据序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期目录保存每个结果：`<dir>/YYYY/MM/DD/HH-MM-SS-XXXX.png`
///
/// 带 `?record` 参数时，同名 `.json` 文件保存响应中的其余元数据。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u16>,
  record: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");
    let directory = uri
      .to_file_path()
      .map_err(|_| DirectoryRecordOutputError::InvalidPath(uri.to_string()))?;

    Ok(DirectoryRecordOutput {
      directory,
      frame_counter: Mutex::new(0),
      record,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl AsRef<Path>, record: bool) -> Self {
    DirectoryRecordOutput {
      directory: directory.as_ref().to_path_buf(),
      frame_counter: Mutex::new(0),
      record,
    }
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counter.lock();
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, result: &DetectionResult) -> Result<(), Self::Error> {
    let png = result.png_bytes()?;
    let path = self.frame_path()?;
    std::fs::write(&path, png)?;

    if self.record {
      let metadata = serde_json::to_vec_pretty(result.metadata())?;
      std::fs::write(path.with_extension("json"), metadata)?;
    }

    debug!("记录检测结果: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn saved_files(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else {
          files.push(path);
        }
      }
    }
    files.sort();
    files
  }

  #[test]
  fn each_result_gets_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path(), false);
    let result = DetectionResult::new("AAECAw==");

    output.render_result(&result).unwrap();
    output.render_result(&result).unwrap();

    let files = saved_files(dir.path());
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| std::fs::read(f).unwrap() == [0, 1, 2, 3]));
    let names: Vec<String> = files
      .iter()
      .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert!(names.iter().any(|name| name.ends_with("-0001.png")));
    assert!(names.iter().any(|name| name.ends_with("-0002.png")));
  }

  #[test]
  fn record_writes_metadata_next_to_image() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?record", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let mut metadata = serde_json::Map::new();
    metadata.insert("risk".to_string(), json!("high"));
    let result = DetectionResult::new("AAECAw==").with_metadata(metadata);
    output.render_result(&result).unwrap();

    let files = saved_files(dir.path());
    let json_file = files
      .iter()
      .find(|f| f.extension().is_some_and(|e| e == "json"))
      .unwrap();
    let saved: serde_json::Value =
      serde_json::from_slice(&std::fs::read(json_file).unwrap()).unwrap();
    assert_eq!(saved, json!({ "risk": "high" }));
  }

  #[test]
  fn percent_encoded_directory_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("inspection records");
    let url = url::Url::parse(&format!("folder://{}", root.display())).unwrap();

    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&DetectionResult::new("AAECAw==")).unwrap();
    assert_eq!(saved_files(&root).len(), 1);
  }
}
