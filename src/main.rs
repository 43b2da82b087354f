use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use env_logger::Env;
use std::path::Path;
use wavecli::audio_input::AudioInput;
use wavecli::audio_output::AudioOutput;
use wavecli::cli::{self, Action};
use wavecli::config::Config;
use wavecli::playback::Playback;
use wavecli::player::PlayerModel;
use wavecli::recorder;
use wavecli::tui::TuiApp;
use wavecli::ui_state::{format_mmss, PlaybackUiState};

fn main() -> Result<()> {
    // コマンドライン引数をパース
    let invocation = cli::parse(std::env::args().skip(1))?;

    // 再生中は TUI が画面を使うので警告以上だけ出す
    let default_level = match invocation.action {
        Action::Play(_) => "warn",
        _ => "info",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let config = match &invocation.config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("設定ファイル {:?} を読み込めません", path))?,
        None => Config::default(),
    };
    log::debug!("設定: {:?}", config);

    match invocation.action {
        Action::Play(path) => run_player(&path, &config),
        Action::Record(path) => run_record(&path, &config),
        Action::Devices => {
            AudioOutput::list_devices()?;
            println!();
            AudioInput::list_devices()?;
            Ok(())
        }
        Action::GenerateConfig(path) => {
            Config::write_default(&path)?;
            println!("設定ファイルを生成しました: {}", path.display());
            Ok(())
        }
        Action::Help => {
            println!("{}", cli::usage());
            Ok(())
        }
        Action::Usage => {
            eprintln!("{}", cli::usage());
            std::process::exit(1);
        }
    }
}

fn run_player(path: &Path, config: &Config) -> Result<()> {
    let (playback, duration) = Playback::open(path, &config.playback)
        .with_context(|| format!("{} を再生できません", path.display()))?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let model = PlayerModel::new(PlaybackUiState::new(filename, duration), &config.ui);

    // 端末外からの SIGINT / SIGTERM も q キーと同じ終了経路を通す
    let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    let mut app = TuiApp::new(model, &playback, &config.playback).with_interrupt(interrupt_rx);
    app.run()?;

    log::info!("再生を終了しました");
    Ok(())
}

fn run_record(path: &Path, config: &Config) -> Result<()> {
    // SIGINT / SIGTERM で停止
    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    let summary = recorder::record_to_file(path, config, &stop_rx)
        .with_context(|| format!("{} に録音できません", path.display()))?;

    println!(
        "保存しました: {} ({}, {} サンプル)",
        summary.path.display(),
        format_mmss(summary.duration),
        summary.samples_written
    );
    if summary.frames_dropped > 0 || summary.write_errors > 0 {
        println!(
            "  破棄したフレーム: {}, 書き込みエラー: {}",
            summary.frames_dropped, summary.write_errors
        );
    }

    Ok(())
}
