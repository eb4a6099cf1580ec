use log::{info, warn};
use thiserror::Error;

use crate::api::MusicApi;
use crate::models::{DownloadReceipt, SearchRequest, Song, MAX_COUNT};

/// 用户可见的失败结果。`Display` 即横幅提示文字。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("请输入歌曲名称")]
    EmptyQuery,

    #[error("未找到歌曲")]
    NotFound,

    #[error("搜索出错，请稍后重试")]
    SearchFailed,

    #[error("无效的下载链接，请重试")]
    InvalidDownloadUrl,

    #[error("下载失败，请稍后重试")]
    DownloadFailed,

    #[error("播放失败，请稍后重试")]
    PlaybackFailed,
}

/// 校验输入并构造搜索请求。空白关键词不会发出请求。
pub fn build_search(input: &str, quality: u32, count: u32) -> Result<SearchRequest, UserError> {
    let word = input.trim();
    if word.is_empty() {
        return Err(UserError::EmptyQuery);
    }
    Ok(SearchRequest {
        word: word.to_string(),
        quality,
        count: count.clamp(1, MAX_COUNT),
    })
}

/// 执行搜索，结果保持后端返回的顺序。
pub fn search<A: MusicApi + ?Sized>(api: &A, request: &SearchRequest) -> Result<Vec<Song>, UserError> {
    let resp = api.search(request).map_err(|e| {
        warn!("search {:?} failed: {:#}", request.word, e);
        UserError::SearchFailed
    })?;

    if !resp.is_ok() {
        info!("search {:?} returned code {}", request.word, resp.code);
        return Err(UserError::NotFound);
    }

    match resp.data {
        Some(songs) if !songs.is_empty() => {
            info!("search {:?}: {} result(s)", request.word, songs.len());
            Ok(songs)
        }
        _ => Err(UserError::NotFound),
    }
}

/// 校验后搜索。空白关键词直接返回 `EmptyQuery`，不会调用后端。
pub fn lookup<A: MusicApi + ?Sized>(
    api: &A,
    input: &str,
    quality: u32,
    count: u32,
) -> Result<Vec<Song>, UserError> {
    let request = build_search(input, quality, count)?;
    search(api, &request)
}

/// 请求后端下载。没有流地址时直接拒绝，不发请求。
pub fn download<A: MusicApi + ?Sized>(api: &A, song: &Song) -> Result<DownloadReceipt, UserError> {
    if song.url.trim().is_empty() {
        return Err(UserError::InvalidDownloadUrl);
    }

    let resp = api.download(song).map_err(|e| {
        warn!("download {} failed: {:#}", song.summary(), e);
        UserError::DownloadFailed
    })?;

    if !resp.is_ok() {
        warn!("download {} returned code {}", song.summary(), resp.code);
        return Err(UserError::DownloadFailed);
    }

    let receipt = resp.data.ok_or(UserError::DownloadFailed)?;
    info!("downloaded {}", receipt.filename);
    Ok(receipt)
}

pub fn download_message(receipt: &DownloadReceipt) -> String {
    format!("下载成功：{}", receipt.filename)
}
