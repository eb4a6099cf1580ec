use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::timefmt;

/// 音质预设：后端 `q` 参数使用的整数代码。
pub const QUALITY_PRESETS: [(&str, u32); 4] = [
    ("标准音质", 4),
    ("HQ高音质", 8),
    ("无损音质", 11),
    ("母带", 14),
];

pub const DEFAULT_QUALITY: u32 = 11;
pub const DEFAULT_COUNT: u32 = 3;
pub const MAX_COUNT: u32 = 10;

/// 搜索结果中的一首歌。
///
/// 字段名与后端 JSON 保持一致（`song`、`singer`、`interval` ...）。
/// 未识别的字段保存在 `extra` 中，下载时原样回传给后端用于写入标签。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// 后端原样给出的 id（字符串或数字），回传时保持原类型。
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(rename = "song", default)]
    pub title: String,
    #[serde(rename = "singer", default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(rename = "interval", default)]
    pub duration: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Song {
    /// 播放器中区分歌曲使用的键。后端偶尔不给 id，此时退回到流地址。
    pub fn key(&self) -> Cow<'_, str> {
        match &self.id {
            Value::Null => Cow::Borrowed(&self.url),
            Value::String(s) if s.is_empty() => Cow::Borrowed(&self.url),
            Value::String(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    pub fn display_title(&self) -> &str {
        non_blank_or_unknown(&self.title)
    }

    pub fn display_artist(&self) -> &str {
        non_blank_or_unknown(&self.artist)
    }

    pub fn display_album(&self) -> &str {
        non_blank_or_unknown(&self.album)
    }

    /// `interval` 解析出的时长，格式不认识时为 None。
    pub fn known_duration(&self) -> Option<Duration> {
        timefmt::parse_interval(&self.duration).map(Duration::from_secs)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} - {} [{}]",
            self.display_artist(),
            self.display_title(),
            self.display_album()
        )
    }
}

fn non_blank_or_unknown(s: &str) -> &str {
    if s.trim().is_empty() {
        "未知"
    } else {
        s
    }
}

/// 后端统一的响应外壳：`{code, data}`。
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownloadReceipt {
    pub filename: String,
    pub path: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub word: String,
    pub quality: u32,
    pub count: u32,
}
