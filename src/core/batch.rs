//! 歌单文件批量下载。
//!
//! 歌单每行一首（如 `晴天 - 周杰伦`），空行忽略。每行按关键词搜索并取第一个
//! 结果交给后端下载。同名歌曲在本次运行中已下载成功的，后续行直接跳过。

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::api::MusicApi;
use crate::core::actions::{self, UserError};
use crate::models::DownloadReceipt;

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Downloaded(DownloadReceipt),
    Failed(UserError),
    Skipped,
}

#[derive(Debug, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    /// The caller asked to stop before the list was finished.
    pub stopped: bool,
}

pub fn read_song_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取歌单 {}", path.display()))?;
    Ok(parse_song_list(&content))
}

pub fn parse_song_list(content: &str) -> Vec<String> {
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `歌名 - 歌手` 中的歌名部分，用于判断重复。
fn song_name(line: &str) -> &str {
    line.split(" - ").next().unwrap_or(line).trim()
}

/// 逐行搜索并下载。
///
/// 每处理完一行调用一次 `progress(序号, 总数, 行, 结果)`；返回
/// `ControlFlow::Break` 时停止，剩余行不再处理。
pub fn download_list<A, F>(api: &A, lines: &[String], quality: u32, mut progress: F) -> BatchReport
where
    A: MusicApi + ?Sized,
    F: FnMut(usize, usize, &str, &ItemOutcome) -> ControlFlow<()>,
{
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let total = lines.len();
    let mut report = BatchReport::default();
    let mut done: HashSet<&str> = HashSet::new();

    for (i, line) in lines.iter().enumerate() {
        let name = song_name(line);
        let outcome = if done.contains(name) {
            ItemOutcome::Skipped
        } else {
            match fetch_one(api, line, quality) {
                Ok(receipt) => ItemOutcome::Downloaded(receipt),
                Err(e) => ItemOutcome::Failed(e),
            }
        };

        match &outcome {
            ItemOutcome::Downloaded(_) => {
                done.insert(name);
                report.succeeded.push(line.to_string());
            }
            ItemOutcome::Failed(_) => report.failed.push(line.to_string()),
            ItemOutcome::Skipped => report.skipped.push(line.to_string()),
        }

        if progress(i + 1, total, line, &outcome).is_break() {
            if i + 1 < total {
                info!("batch stopped after {}/{}", i + 1, total);
                report.stopped = true;
            }
            break;
        }
    }

    info!(
        "batch done: {} ok, {} failed, {} skipped",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped.len()
    );
    report
}

fn fetch_one<A: MusicApi + ?Sized>(
    api: &A,
    line: &str,
    quality: u32,
) -> Result<DownloadReceipt, UserError> {
    let song = actions::lookup(api, line, quality, 1)?
        .into_iter()
        .next()
        .ok_or(UserError::NotFound)?;
    actions::download(api, &song)
}
