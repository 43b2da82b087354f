//! wavecli - WAV ファイルの再生・録音ツール
//!
//! モノラル/ステレオの PCM WAV をターミナル UI 付きで再生し、
//! 既定の入力デバイスから 16bit モノラルの WAV へ録音する。
//!
//! # 主な機能
//!
//! - **再生**: プログレスバー・経過時間・一時停止付きの TUI
//! - **録音**: ハードウェアスレッドを止めない有界キュー経由で WAV に書き出し
//! - **デバイス占有**: 同時に開けるストリームはプロセス全体で1つだけ
//!
//! # アーキテクチャ
//!
//! ```text
//! 再生:
//! [WAV File] → [AudioSource] → [Voice] ←(オーディオロック)→ [AudioOutput callback]
//!                                 │                               │
//!                             position                      完了 (bounded 1)
//!                                 ↓                               ↓
//!                         [PlayerModel::update] ← Tick / Key ← [TuiApp]
//!
//! 録音:
//! [AudioInput callback] → [FrameProducer] → (bounded, lossy) → [FrameConsumer]
//!                                                                    ↓
//!                               停止シグナル ──select!──→ [Recorder] → [WavWriter]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use wavecli::config::Config;
//! use wavecli::playback::Playback;
//!
//! let config = Config::default();
//! let (playback, duration) = Playback::open("song.wav", &config.playback).unwrap();
//! println!("{:?} / {} frames", duration, playback.len());
//! ```

pub mod audio_input;
pub mod audio_output;
pub mod capture;
pub mod cli;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod playback;
pub mod player;
pub mod recorder;
pub mod source;
pub mod tui;
pub mod types;
pub mod ui_state;
pub mod wav_writer;
