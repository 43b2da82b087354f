use crate::error::{Error, Result};
use crate::types::AudioFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// アプリケーション設定
///
/// 設定ファイルは任意。`--config <path>` が指定されない場合は
/// すべてデフォルト値で動作する。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// 録音デバイス設定
///
/// # デフォルト値
///
/// - `device_id`: "default" (システムのデフォルトデバイス)
/// - `sample_rate`: 44100 Hz
/// - `channels`: 1 (モノラル)
/// - `buffer_ms`: 100 ms
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u32,
}

/// キャプチャキュー設定
///
/// # デフォルト値
///
/// - `queue_capacity`: 1024 フレーム
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// 再生設定
///
/// # デフォルト値
///
/// - `output_device`: "default"
/// - `tick_ms`: 100 ms (UI 更新周期)
/// - `buffer_ms`: 100 ms (ハードウェアバッファ長)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_device_id")]
    pub output_device: String,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u32,
}

/// 表示設定
///
/// プログレスバーの幅は `端末幅 - 10` を `[min_width, max_width]` に収める。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_min_width")]
    pub min_width: u16,
    #[serde(default = "default_max_width")]
    pub max_width: u16,
}

// Default functions
fn default_device_id() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    1
}

fn default_buffer_ms() -> u32 {
    100
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_tick_ms() -> u64 {
    100
}

fn default_min_width() -> u16 {
    10
}

fn default_max_width() -> u16 {
    80
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_ms: default_buffer_ms(),
        }
    }
}

impl AudioConfig {
    /// 録音ファイルのフォーマット（16bit 固定）
    pub fn recording_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: 16,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            output_device: default_device_id(),
            tick_ms: default_tick_ms(),
            buffer_ms: default_buffer_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            max_width: default_max_width(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込み、パース、値の検証に失敗した場合に `Error::Config` を返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use wavecli::config::Config;
    /// let config = Config::from_file("wavecli.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "設定ファイルの読み込みに失敗: {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("設定ファイルのパースに失敗: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| Error::Config(format!("設定のシリアライズに失敗: {}", e)))?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(Error::Config("audio.sample_rate は 1 以上が必要です".into()));
        }
        if self.audio.channels == 0 {
            return Err(Error::Config("audio.channels は 1 以上が必要です".into()));
        }
        if self.capture.queue_capacity == 0 {
            return Err(Error::Config(
                "capture.queue_capacity は 1 以上が必要です".into(),
            ));
        }
        if self.playback.tick_ms == 0 {
            return Err(Error::Config("playback.tick_ms は 1 以上が必要です".into()));
        }
        if self.ui.min_width > self.ui.max_width {
            return Err(Error::Config(
                "ui.min_width は ui.max_width 以下である必要があります".into(),
            ));
        }
        Ok(())
    }
}
