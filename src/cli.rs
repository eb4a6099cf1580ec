use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Input, Select};

use crate::api::http::HttpApi;
use crate::config::{self, Config};
use crate::core::actions;
use crate::core::batch::{self, ItemOutcome};
use crate::models::{Song, QUALITY_PRESETS};
use crate::player::{ButtonState, PlaybackController, RodioBackend};

#[derive(Parser)]
#[command(name = "tunefetch", about = "音乐搜索、下载与在线试听")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// 以图形界面运行
    #[arg(long)]
    pub gui: bool,
}

#[derive(Args, Clone)]
pub struct SearchArgs {
    /// 歌曲名称
    pub word: String,
    /// 音质代码（4 标准 / 8 HQ / 11 无损 / 14 母带）
    #[arg(short, long)]
    pub quality: Option<u32>,
    /// 返回结果数量
    #[arg(short = 'n', long)]
    pub count: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 搜索歌曲并以表格显示
    Search(SearchArgs),
    /// 搜索后选择歌曲，让后端下载
    Download {
        #[command(flatten)]
        search: SearchArgs,
        /// 下载全部结果，不再逐个选择
        #[arg(long)]
        all: bool,
    },
    /// 从歌单文件批量下载（每行一首，如 "晴天 - 周杰伦"）
    Batch {
        /// 歌单文件路径
        file: PathBuf,
        /// 音质代码（4 标准 / 8 HQ / 11 无损 / 14 母带）
        #[arg(short, long)]
        quality: Option<u32>,
    },
    /// 搜索后选择歌曲并在线播放
    Play(SearchArgs),
    /// 设置后端地址与默认参数
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    let cfg = config::load_config();

    match cli.command {
        Some(Commands::Search(args)) => cmd_search(&cfg, &args),
        Some(Commands::Download { search, all }) => cmd_download(&cfg, &search, all),
        Some(Commands::Batch { file, quality }) => cmd_batch(&cfg, &file, quality),
        Some(Commands::Play(args)) => cmd_play(&cfg, &args),
        Some(Commands::Config) => cmd_config(cfg),
        None => {
            if cli.gui || cfg!(feature = "gui") {
                #[cfg(feature = "gui")]
                {
                    crate::gui::launch(cfg);
                    Ok(())
                }
                #[cfg(not(feature = "gui"))]
                {
                    bail!("未启用图形界面功能，请重新构建: cargo build --features gui");
                }
            } else {
                println!("用法: tunefetch <命令>");
                println!("更多信息请运行 tunefetch --help");
                Ok(())
            }
        }
    }
}

/// 搜索并打印结果；失败时把提示转成错误退出。
fn find_songs(api: &HttpApi, cfg: &Config, args: &SearchArgs) -> Result<Vec<Song>> {
    println!("正在搜索: {}", args.word.trim());
    let songs = actions::lookup(
        api,
        &args.word,
        args.quality.unwrap_or(cfg.search.quality),
        args.count.unwrap_or(cfg.search.count),
    )?;
    print_songs(&songs);
    Ok(songs)
}

fn print_songs(songs: &[Song]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "歌名", "歌手", "专辑", "时长", "音质"]);

    for (i, song) in songs.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(song.display_title()),
            Cell::new(song.display_artist()),
            Cell::new(song.display_album()),
            Cell::new(&song.duration),
            Cell::new(&song.quality),
        ]);
    }

    println!("{table}");
}

fn pick_song<'a>(songs: &'a [Song], prompt: &str) -> Result<Option<&'a Song>> {
    let mut items: Vec<String> = songs.iter().map(|s| s.summary()).collect();
    items.push("取消".to_string());

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()?;

    Ok(songs.get(selection))
}

fn cmd_search(cfg: &Config, args: &SearchArgs) -> Result<()> {
    let api = HttpApi::new(&cfg.backend)?;
    let songs = find_songs(&api, cfg, args)?;
    println!("\n共 {} 首", songs.len());
    Ok(())
}

fn cmd_download(cfg: &Config, args: &SearchArgs, all: bool) -> Result<()> {
    let api = HttpApi::new(&cfg.backend)?;
    let songs = find_songs(&api, cfg, args)?;

    let targets: Vec<&Song> = if all {
        songs.iter().collect()
    } else {
        match pick_song(&songs, "选择要下载的歌曲")? {
            Some(song) => vec![song],
            None => {
                println!("已取消。");
                return Ok(());
            }
        }
    };

    let mut failed = 0;
    for song in targets {
        println!("--- {} ---", song.summary());
        match actions::download(&api, song) {
            Ok(receipt) => println!("  {}", actions::download_message(&receipt)),
            Err(e) => {
                failed += 1;
                println!("  {}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} 首歌曲下载失败", failed);
    }
    Ok(())
}

fn cmd_batch(cfg: &Config, file: &Path, quality: Option<u32>) -> Result<()> {
    let api = HttpApi::new(&cfg.backend)?;
    let lines = batch::read_song_list(file)?;
    if lines.is_empty() {
        println!("歌单中没有歌曲。");
        return Ok(());
    }
    println!("共 {} 首歌曲", lines.len());

    let quality = quality.unwrap_or(cfg.search.quality);
    let report = batch::download_list(&api, &lines, quality, |i, total, line, outcome| {
        println!("[{}/{}] {}", i, total, line);
        match outcome {
            ItemOutcome::Downloaded(receipt) => {
                println!("  {}", actions::download_message(receipt))
            }
            ItemOutcome::Failed(e) => println!("  {}", e),
            ItemOutcome::Skipped => println!("  已下载过，跳过"),
        }
        ControlFlow::Continue(())
    });

    if !report.failed.is_empty() {
        println!("\n下载失败的歌曲:");
        for line in &report.failed {
            println!("- {}", line);
        }
    }
    println!("\n下载统计:");
    println!("成功: {}", report.succeeded.len());
    println!("失败: {}", report.failed.len());
    println!("跳过: {}", report.skipped.len());

    if !report.failed.is_empty() {
        bail!("{} 首歌曲下载失败", report.failed.len());
    }
    Ok(())
}

fn cmd_play(cfg: &Config, args: &SearchArgs) -> Result<()> {
    let api = HttpApi::new(&cfg.backend)?;
    let songs = find_songs(&api, cfg, args)?;

    let Some(song) = pick_song(&songs, "选择要播放的歌曲")? else {
        println!("已取消。");
        return Ok(());
    };

    let mut player = PlaybackController::new(RodioBackend::new()?, api.base_url());
    let id = song.key().into_owned();
    let known = song.known_duration();
    player.toggle(&song.url, &id, known);

    println!("正在播放: {} (Ctrl-C 退出)", song.summary());
    let mut stdout = std::io::stdout();
    let mut started = false;

    loop {
        player.poll();
        if let Some(notice) = player.take_notices().into_iter().next() {
            println!();
            bail!("{}", notice.message);
        }

        match player.button(&id) {
            ButtonState::Loading => {
                print!("\r缓冲中...");
            }
            ButtonState::Playing => {
                started = true;
                let view = player.progress(&id, known);
                print!("\r{} {:>5.1}%", view.label, view.percent);
            }
            ButtonState::Paused if started && player.current_id().is_none() => {
                println!("\n播放结束。");
                break;
            }
            _ => {}
        }
        stdout.flush()?;
        std::thread::sleep(Duration::from_millis(200));
    }

    player.shutdown();
    Ok(())
}

fn cmd_config(mut cfg: Config) -> Result<()> {
    println!("后端设置");
    println!("(后端需提供 /api/search、/api/download、/api/play 接口)\n");

    let base_url: String = Input::new()
        .with_prompt("后端地址")
        .with_initial_text(cfg.backend.base_url.clone())
        .interact_text()?;

    let presets: Vec<String> = QUALITY_PRESETS
        .iter()
        .map(|(name, code)| format!("{} ({})", name, code))
        .collect();
    let current = QUALITY_PRESETS
        .iter()
        .position(|(_, code)| *code == cfg.search.quality)
        .unwrap_or(2);
    let quality = Select::new()
        .with_prompt("默认音质")
        .items(&presets)
        .default(current)
        .interact()?;

    let count: u32 = Input::new()
        .with_prompt("默认结果数量")
        .default(cfg.search.count)
        .interact_text()?;

    cfg.backend.base_url = base_url.trim().to_string();
    cfg.search.quality = QUALITY_PRESETS[quality].1;
    cfg.search.count = count;

    config::save_config(&cfg)?;
    println!("\n设置已保存！");
    Ok(())
}

