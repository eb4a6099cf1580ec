use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;

use crate::api::MusicApi;
use crate::config::BackendConfig;
use crate::models::{ApiResponse, DownloadReceipt, SearchRequest, Song};

/// HTTP 后端客户端。
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("HTTP 客户端创建失败")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl MusicApi for HttpApi {
    fn search(&self, request: &SearchRequest) -> Result<ApiResponse<Vec<Song>>> {
        let quality = request.quality.to_string();
        let count = request.count.to_string();
        debug!(
            "GET /api/search word={:?} q={} count={}",
            request.word, quality, count
        );

        let resp = self
            .client
            .get(self.endpoint("/api/search"))
            .query(&[
                ("word", request.word.as_str()),
                ("q", quality.as_str()),
                ("count", count.as_str()),
            ])
            .send()
            .context("搜索请求发送失败")?
            .error_for_status()
            .context("搜索请求失败")?
            .json()
            .context("搜索响应解析失败")?;

        Ok(resp)
    }

    fn download(&self, song: &Song) -> Result<ApiResponse<DownloadReceipt>> {
        let song_info = serde_json::to_string(song).context("歌曲信息序列化失败")?;
        debug!("GET /api/download {}", song.summary());

        let resp = self
            .client
            .get(self.endpoint("/api/download"))
            .query(&[("url", song.url.as_str()), ("song_info", song_info.as_str())])
            .send()
            .context("下载请求发送失败")?
            .error_for_status()
            .context("下载请求失败")?
            .json()
            .context("下载响应解析失败")?;

        Ok(resp)
    }

    fn fetch_cover(&self, song: &Song) -> Result<Vec<u8>> {
        anyhow::ensure!(!song.cover.trim().is_empty(), "没有封面地址");

        let data = self
            .client
            .get(&song.cover)
            .send()
            .context("封面下载失败")?
            .error_for_status()?
            .bytes()?
            .to_vec();

        Ok(data)
    }
}
