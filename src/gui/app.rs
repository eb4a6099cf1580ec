use std::collections::HashSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use egui::{Color32, ColorImage, RichText, TextureHandle};

use crate::api::http::HttpApi;
use crate::api::MusicApi;
use crate::config::Config;
use crate::core::actions::{self, UserError};
use crate::core::notice::{Notice, NoticeBoard, NoticeKind};
use crate::models::{DownloadReceipt, Song, MAX_COUNT, QUALITY_PRESETS};
use crate::player::{ButtonState, PlaybackController, RodioBackend};

const COVER_SIZE: f32 = 96.0;
const TICK: Duration = Duration::from_millis(200);

enum BgResult {
    SearchDone(u64, Result<Vec<Song>, UserError>),
    DownloadDone(String, Result<DownloadReceipt, UserError>),
    CoverDone(u64, usize, Vec<u8>),
    CoverFailed(u64, usize),
}

enum Cover {
    Pending,
    Loaded(TextureHandle),
    Missing,
}

enum CardAction {
    Toggle(usize),
    Download(usize),
}

pub struct TuneFetchApp {
    api: Option<HttpApi>,

    // Search form
    search_word: String,
    quality: u32,
    count: u32,

    // Results; `results_epoch` tags background work for the current list
    songs: Vec<Song>,
    covers: Vec<Cover>,
    results_epoch: u64,

    // Playback
    player: Option<PlaybackController<RodioBackend>>,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
    is_searching: bool,
    downloading: HashSet<String>,
    notices: NoticeBoard,
}

impl TuneFetchApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        Self::setup_cjk_fonts(&cc.egui_ctx);
        let (tx, rx) = mpsc::channel();
        let mut notices = NoticeBoard::new(config.ui.notice_ttl());

        let api = match HttpApi::new(&config.backend) {
            Ok(api) => Some(api),
            Err(e) => {
                log::error!("backend client unavailable: {:#}", e);
                notices.show(Notice::error(format!("{:#}", e)), Instant::now());
                None
            }
        };

        let player = api.as_ref().and_then(|api| match RodioBackend::new() {
            Ok(backend) => Some(PlaybackController::new(backend, api.base_url())),
            Err(e) => {
                log::error!("playback unavailable: {:#}", e);
                None
            }
        });

        Self {
            api,
            search_word: String::new(),
            quality: config.search.quality,
            count: config.search.count.clamp(1, MAX_COUNT),
            songs: Vec::new(),
            covers: Vec::new(),
            results_epoch: 0,
            player,
            tx,
            rx,
            is_searching: false,
            downloading: HashSet::new(),
            notices,
        }
    }

    fn setup_cjk_fonts(ctx: &egui::Context) {
        let mut fonts = egui::FontDefinitions::default();

        // 系统中文字体路径
        let font_paths = [
            "/System/Library/Fonts/PingFang.ttc",
            "/System/Library/Fonts/STHeiti Medium.ttc",
            "C:\\Windows\\Fonts\\msyh.ttc",
            // Linux
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        ];

        for path in &font_paths {
            if let Ok(font_data) = std::fs::read(path) {
                fonts
                    .font_data
                    .insert("cjk_font".to_string(), egui::FontData::from_owned(font_data));

                // Fallback after the built-in fonts
                for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                    if let Some(list) = fonts.families.get_mut(&family) {
                        list.push("cjk_font".to_string());
                    }
                }

                ctx.set_fonts(fonts);
                return;
            }
        }
        log::warn!("no CJK font found, Chinese text may not render");
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.show(notice, Instant::now());
    }

    fn start_search(&mut self, ctx: &egui::Context) {
        let request = match actions::build_search(&self.search_word, self.quality, self.count) {
            Ok(request) => request,
            Err(e) => {
                self.notify(e.into());
                return;
            }
        };
        let Some(api) = self.api.clone() else {
            return;
        };

        self.results_epoch += 1;
        let epoch = self.results_epoch;
        self.is_searching = true;
        let tx = self.tx.clone();
        let ctx = ctx.clone();

        std::thread::spawn(move || {
            let result = actions::search(&api, &request);
            let _ = tx.send(BgResult::SearchDone(epoch, result));
            ctx.request_repaint();
        });
    }

    fn fetch_covers(&self, ctx: &egui::Context) {
        let Some(api) = self.api.as_ref() else {
            return;
        };

        for (index, song) in self.songs.iter().enumerate() {
            if song.cover.trim().is_empty() {
                continue;
            }
            let api = api.clone();
            let song = song.clone();
            let tx = self.tx.clone();
            let ctx = ctx.clone();
            let epoch = self.results_epoch;

            std::thread::spawn(move || {
                let msg = match api.fetch_cover(&song) {
                    Ok(data) => BgResult::CoverDone(epoch, index, data),
                    Err(e) => {
                        log::debug!("cover for {} failed: {:#}", song.summary(), e);
                        BgResult::CoverFailed(epoch, index)
                    }
                };
                let _ = tx.send(msg);
                ctx.request_repaint();
            });
        }
    }

    fn start_download(&mut self, ctx: &egui::Context, index: usize) {
        let Some(song) = self.songs.get(index).cloned() else {
            return;
        };
        if song.url.trim().is_empty() {
            self.notify(UserError::InvalidDownloadUrl.into());
            return;
        }
        let Some(api) = self.api.clone() else {
            return;
        };

        let key = song.key().to_string();
        if !self.downloading.insert(key.clone()) {
            return;
        }
        let tx = self.tx.clone();
        let ctx = ctx.clone();

        std::thread::spawn(move || {
            let result = actions::download(&api, &song);
            let _ = tx.send(BgResult::DownloadDone(key, result));
            ctx.request_repaint();
        });
    }

    fn toggle_song(&mut self, index: usize) {
        let Some(song) = self.songs.get(index) else {
            return;
        };
        match self.player.as_mut() {
            Some(player) => player.toggle(&song.url, &song.key(), song.known_duration()),
            None => self
                .notices
                .show(UserError::PlaybackFailed.into(), Instant::now()),
        }
    }

    fn process_bg_results(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BgResult::SearchDone(epoch, result) => {
                    if epoch != self.results_epoch {
                        continue;
                    }
                    self.is_searching = false;
                    // The bars are rebuilt; a drag on an old one never sees its release.
                    if let Some(player) = self.player.as_mut() {
                        player.cancel_drag();
                    }
                    match result {
                        Ok(songs) => {
                            self.covers = songs
                                .iter()
                                .map(|s| {
                                    if s.cover.trim().is_empty() {
                                        Cover::Missing
                                    } else {
                                        Cover::Pending
                                    }
                                })
                                .collect();
                            self.songs = songs;
                            self.fetch_covers(ctx);
                        }
                        Err(e) => {
                            self.songs.clear();
                            self.covers.clear();
                            self.notify(e.into());
                        }
                    }
                }
                BgResult::DownloadDone(key, result) => {
                    self.downloading.remove(&key);
                    match result {
                        Ok(receipt) => {
                            self.notify(Notice::success(actions::download_message(&receipt)))
                        }
                        Err(e) => self.notify(e.into()),
                    }
                }
                BgResult::CoverDone(epoch, index, data) => {
                    if epoch != self.results_epoch {
                        continue;
                    }
                    let cover = match load_texture(ctx, &format!("cover_{}_{}", epoch, index), &data)
                    {
                        Some(texture) => Cover::Loaded(texture),
                        None => Cover::Missing,
                    };
                    if let Some(slot) = self.covers.get_mut(index) {
                        *slot = cover;
                    }
                }
                BgResult::CoverFailed(epoch, index) => {
                    if epoch != self.results_epoch {
                        continue;
                    }
                    if let Some(slot) = self.covers.get_mut(index) {
                        *slot = Cover::Missing;
                    }
                }
            }
        }
    }
}

impl eframe::App for TuneFetchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results(ctx);

        if let Some(player) = self.player.as_mut() {
            player.poll();
            for notice in player.take_notices() {
                self.notices.show(notice, Instant::now());
            }
        }

        let now = Instant::now();
        self.notices.expire(now);

        // Top panel: search form + notice banner
        egui::TopBottomPanel::top("search_panel").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label("歌曲名称:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.search_word)
                        .hint_text("输入歌曲名称")
                        .desired_width(240.0),
                );

                let selected = QUALITY_PRESETS
                    .iter()
                    .find(|(_, code)| *code == self.quality)
                    .map(|(name, _)| name.to_string())
                    .unwrap_or_else(|| format!("q={}", self.quality));
                egui::ComboBox::from_label("音质")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for (name, code) in QUALITY_PRESETS {
                            ui.selectable_value(&mut self.quality, code, name);
                        }
                    });

                ui.add(egui::Slider::new(&mut self.count, 1..=MAX_COUNT).text("数量"));

                let clicked = ui
                    .add_enabled(!self.is_searching, egui::Button::new("搜索"))
                    .clicked();
                let entered =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if clicked || (entered && !self.is_searching) {
                    self.start_search(ctx);
                }
                if self.is_searching {
                    ui.spinner();
                }
            });

            if let Some(notice) = self.notices.current() {
                let color = match notice.kind {
                    NoticeKind::Error => Color32::from_rgb(220, 60, 60),
                    NoticeKind::Success => Color32::from_rgb(40, 160, 80),
                };
                ui.label(RichText::new(&notice.message).color(color));
            }
            ui.add_space(6.0);
        });

        // Central panel: one card per result
        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.songs.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("搜索歌曲，在线试听或下载");
                });
                return;
            }

            ui.heading(format!("搜索结果（{}）", self.songs.len()));
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                for (i, song) in self.songs.iter().enumerate() {
                    let key = song.key();
                    let key = key.as_ref();
                    let state = self
                        .player
                        .as_ref()
                        .map(|p| p.button(key))
                        .unwrap_or_default();
                    let downloading = self.downloading.contains(key);

                    ui.horizontal(|ui| {
                        draw_cover(ui, self.covers.get(i));

                        ui.vertical(|ui| {
                            ui.label(RichText::new(song.display_title()).strong().size(16.0));
                            ui.label(song.display_artist());
                            ui.label(
                                RichText::new(format!(
                                    "专辑：{}\n时长：{}\n音质：{}",
                                    song.display_album(),
                                    song.duration,
                                    song.quality
                                ))
                                .small(),
                            );

                            ui.horizontal(|ui| {
                                let play = egui::Button::new(play_label(state));
                                if ui.add_enabled(!state.is_busy(), play).clicked() {
                                    action = Some(CardAction::Toggle(i));
                                }
                                let label = if downloading { "下载中..." } else { "⬇ 下载" };
                                if ui
                                    .add_enabled(!downloading, egui::Button::new(label))
                                    .clicked()
                                {
                                    action = Some(CardAction::Download(i));
                                }
                            });

                            if let Some(player) = self.player.as_mut() {
                                progress_bar(ui, player, key, song.known_duration());
                            }
                        });
                    });
                    ui.separator();
                }
            });
        });

        match action {
            Some(CardAction::Toggle(i)) => self.toggle_song(i),
            Some(CardAction::Download(i)) => self.start_download(ctx, i),
            None => {}
        }

        if self.player.as_ref().is_some_and(|p| p.is_active()) {
            ctx.request_repaint_after(TICK);
        }
        if let Some(left) = self.notices.remaining(now) {
            ctx.request_repaint_after(left);
        }
    }
}

fn play_label(state: ButtonState) -> &'static str {
    match state {
        ButtonState::Idle | ButtonState::Paused => "▶ 播放",
        ButtonState::Loading => "⏳ 加载中",
        ButtonState::Playing => "⏸ 暂停",
        ButtonState::Error => "⚠ 重试",
    }
}

fn draw_cover(ui: &mut egui::Ui, cover: Option<&Cover>) {
    let size = egui::vec2(COVER_SIZE, COVER_SIZE);
    match cover {
        Some(Cover::Loaded(texture)) => {
            ui.image(egui::load::SizedTexture::new(texture.id(), size));
        }
        Some(Cover::Pending) => {
            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            ui.painter().rect_filled(rect, 6.0, Color32::from_gray(235));
        }
        Some(Cover::Missing) | None => {
            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            ui.painter().rect_filled(rect, 6.0, Color32::from_gray(221));
        }
    }
}

/// Progress bar that doubles as a drag-to-seek control.
fn progress_bar(
    ui: &mut egui::Ui,
    player: &mut PlaybackController<RodioBackend>,
    id: &str,
    fallback: Option<Duration>,
) {
    ui.horizontal(|ui| {
        let width = (ui.available_width() - 120.0).max(120.0);
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(width, 10.0), egui::Sense::click_and_drag());
        let fraction_at = |pos: egui::Pos2| ((pos.x - rect.min.x) / rect.width()) as f64;
        let pos = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|i| i.pointer.latest_pos()));

        if response.drag_started() {
            if let Some(pos) = pos {
                player.pointer_down(id, fraction_at(pos));
            }
        } else if response.dragged() {
            if let Some(pos) = pos {
                player.pointer_move(fraction_at(pos));
            }
        }
        if response.drag_stopped() {
            // Commit with the release position, not the last move.
            let fraction = pos
                .map(fraction_at)
                .or_else(|| player.dragging().map(|d| d.fraction))
                .unwrap_or(0.0);
            player.pointer_up(fraction);
        }
        if response.clicked() {
            if let Some(pos) = pos {
                let fraction = fraction_at(pos);
                if player.pointer_down(id, fraction) {
                    player.pointer_up(fraction);
                }
            }
        }

        let view = player.progress(id, fallback);
        let painter = ui.painter();
        painter.rect_filled(rect, 4.0, ui.visuals().widgets.inactive.bg_fill);
        let mut fill = rect;
        fill.set_width(rect.width() * (view.percent / 100.0) as f32);
        painter.rect_filled(fill, 4.0, ui.visuals().selection.bg_fill);

        ui.label(RichText::new(view.label).monospace());
    });
}

fn load_texture(ctx: &egui::Context, name: &str, data: &[u8]) -> Option<TextureHandle> {
    let img = image::load_from_memory(data).ok()?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    let color_image = ColorImage::from_rgba_unmultiplied(size, &pixels);
    Some(ctx.load_texture(name, color_image, Default::default()))
}
