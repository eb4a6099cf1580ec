pub mod http;

use anyhow::{Context, Result};

use crate::models::{ApiResponse, DownloadReceipt, SearchRequest, Song};

/// 音乐后端接口。
/// 真实实现走 HTTP（`/api/search`、`/api/download`），测试里可替换为假实现。
pub trait MusicApi {
    /// 按关键词搜索，返回后端原始的 `{code, data}` 响应。
    fn search(&self, request: &SearchRequest) -> Result<ApiResponse<Vec<Song>>>;
    /// 让后端下载歌曲并写入标签。
    fn download(&self, song: &Song) -> Result<ApiResponse<DownloadReceipt>>;
    /// 下载封面图片。
    fn fetch_cover(&self, song: &Song) -> Result<Vec<u8>>;
}

/// Build the `/api/play` streaming endpoint for a song's stream URL.
pub fn play_url(base_url: &str, url: &str) -> Result<String> {
    let endpoint = format!("{}/api/play", base_url.trim_end_matches('/'));
    let parsed = reqwest::Url::parse_with_params(&endpoint, &[("url", url)])
        .with_context(|| format!("无效的后端地址: {}", base_url))?;
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_url_encodes_stream_url() {
        let url = play_url(
            "http://127.0.0.1:8000/",
            "https://cdn.example.com/a b.flac?vkey=1&x=2",
        )
        .unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:8000/api/play?url=https%3A%2F%2Fcdn.example.com%2Fa+b.flac%3Fvkey%3D1%26x%3D2"
        );
    }

    #[test]
    fn test_play_url_rejects_bad_base() {
        assert!(play_url("not a url", "https://x/y.mp3").is_err());
    }
}
