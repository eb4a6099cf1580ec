#[cfg(feature = "gui")]
mod app;

#[cfg(feature = "gui")]
pub fn launch(config: crate::config::Config) {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 720.0]),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "音乐搜索下载",
        options,
        Box::new(move |cc| Ok(Box::new(app::TuneFetchApp::new(cc, config)))),
    ) {
        log::error!("GUI exited with error: {}", e);
    }
}
