// 该文件是 StructScan （结构扫描） 项目的一部分。
// src/about.rs - 静态介绍信息
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

pub const PRODUCT_NAME: &str = "StructScan";

/// 顶部导航
pub const HEADER: &[&str] = &["HOME", "ABOUT", "DEMO", "CONTACT"];

pub const TAGLINE: &str = "AI-Powered Infrastructure Analysis";

pub const ABOUT: &[&str] = &[
  "Real-time detection and risk assessment of structural damage",
  "AI-powered crack detection using YOLOv8 technology",
  "Upload images or use live camera for instant analysis",
  "Automated identification of structural weaknesses",
];

pub const FOOTER: &str = "Contact: Made by Arsh Kalra";

/// 页脚联系方式：(名称, 显示文本, 链接)
pub const CONTACTS: &[(&str, &str, &str)] = &[
  ("Email", "arshkalra17@gmail.com", "mailto:arshkalra17@gmail.com"),
  (
    "LinkedIn",
    "My LinkedIn",
    "https://www.linkedin.com/in/arsh-kalra-b813b928b/",
  ),
  ("GitHub", "My GitHub", "https://github.com/arshkalra17"),
];

/// 生成启动横幅（顶部、首页、介绍三部分）
pub fn banner() -> String {
  let title = PRODUCT_NAME.to_uppercase();
  let mut lines = vec![
    format!("{} | {}", PRODUCT_NAME, HEADER.join(" · ")),
    "=".repeat(title.len().max(TAGLINE.len())),
    title,
    TAGLINE.to_string(),
    String::new(),
    format!("About {}", PRODUCT_NAME),
  ];
  lines.extend(ABOUT.iter().map(|item| format!("  - {}", item)));
  lines.join("\n")
}

pub fn print_banner() {
  println!("{}", banner());
  println!();
}

/// 生成页脚
pub fn footer() -> String {
  let mut lines = vec![FOOTER.to_string()];
  lines.extend(
    CONTACTS
      .iter()
      .map(|(name, text, link)| format!("  {}: {} <{}>", name, text, link)),
  );
  lines.join("\n")
}

pub fn print_footer() {
  println!();
  println!("{}", footer());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn banner_keeps_section_order() {
    let banner = banner();
    let header = banner.find("DEMO").unwrap();
    let home = banner.find(TAGLINE).unwrap();
    let about = banner.find(ABOUT[0]).unwrap();
    assert!(header < home && home < about);
    assert!(!banner.contains(FOOTER));
  }

  #[test]
  fn footer_lists_every_contact() {
    let footer = footer();
    assert!(footer.starts_with(FOOTER));
    assert!(footer.contains("mailto:arshkalra17@gmail.com"));
    assert!(footer.contains("https://github.com/arshkalra17"));
    assert!(footer.contains("linkedin.com/in/arsh-kalra-b813b928b"));
    assert_eq!(footer.lines().count(), 1 + CONTACTS.len());
  }
}
