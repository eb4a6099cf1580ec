mod api;
mod cli;
mod config;
mod core;
mod models;
mod player;

#[cfg(feature = "gui")]
mod gui;

use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = cli::Cli::parse();

    if let Err(e) = cli::run(cli) {
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}
