mod audio;
mod capture;
mod config;
mod error;
mod event;
mod media;
mod notice;
mod platform_support;
mod screen;
mod sound;
#[cfg(test)]
mod testing;
mod ui;

use dioxus::prelude::*;
use tracing::{error, info};

use config::ScreenConfig;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting Media Board...");

    let config = ScreenConfig::load().unwrap_or_else(|e| {
        error!("Failed to load config, using defaults: {:#}", e);
        ScreenConfig::default()
    });
    info!("Remote audio: {}", config.audio_url);
    info!("Remote video: {}", config.video_url);

    let builder = dioxus::LaunchBuilder::new().with_context(config);

    #[cfg(feature = "desktop")]
    let builder = builder.with_cfg(
        dioxus::desktop::Config::new().with_window(
            dioxus::desktop::WindowBuilder::new()
                .with_title("Media Board")
                .with_always_on_top(false),
        ),
    );

    builder.launch(ui::App);
}
