// src/utils.rs

use crate::constants;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// 路径分隔符、控制字符以及 Windows 文件名中不允许出现的字符
static UNSAFE_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\<>:"|?*\x00-\x1F\x7F]"#).unwrap());
static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[A-Za-z0-9]{{1,{}}}$", constants::MAX_EXTENSION_LEN)).unwrap()
});

/// 把名称清理为单个路径段：去掉首尾空格，不安全字符替换为 `_`，
/// 并去掉 Windows 不接受的结尾 `.` 与空格。
pub fn sanitize_segment(name: &str) -> String {
    let name = UNSAFE_CHARS_RE.replace_all(name.trim(), "_");
    if matches!(name.as_ref(), "." | "..") {
        return "_".to_string();
    }
    match name.trim_end_matches(['.', ' ']) {
        "" => constants::UNNAMED_FILE.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// 生成最终的本地文件名；若提议名称尚未以该扩展名结尾则补上。
pub fn finalize_file_name(proposed: &str, extension: Option<&str>) -> String {
    let name = sanitize_segment(proposed);
    match extension {
        Some(ext) if !has_extension(&name, ext) => format!("{}.{}", name, ext),
        _ => name,
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, existing)| !stem.is_empty() && existing.eq_ignore_ascii_case(ext))
}

/// 从（重定向后的）最终 URL 的最后一个路径段中提取扩展名，查询参数不参与。
pub fn extension_from_url(url: &Url) -> Option<String> {
    let last_segment = url.path_segments()?.next_back()?;
    let decoded = percent_decode_str(last_segment).decode_utf8_lossy();
    extension_of(&decoded)
}

/// 文件名中最后一个 `.` 之后的部分，只接受短的字母数字扩展名。
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || !EXTENSION_RE.is_match(ext) {
        return None;
    }
    Some(ext.to_string())
}

/// 解析 Content-Disposition 头中的文件名。
///
/// 支持 `filename="a.pdf"`、`filename=a.pdf` 以及 RFC 5987 的 `filename*=UTF-8''a.pdf`。
pub fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let decoded = percent_decode_str(encoded[..end].trim()).decode_utf8_lossy();
            if !decoded.is_empty() {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();
    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"')?;
        return Some(stripped[..end].to_string()).filter(|s| !s.is_empty());
    }
    let end = value.find(';').unwrap_or(value.len());
    Some(value[..end].trim().to_string()).filter(|s| !s.is_empty())
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}
