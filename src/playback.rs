//! 再生同期
//!
//! ハードウェアのコールバックスレッドとコントロールループの間で共有するのは
//! 次の3つだけ:
//!
//! - 一時停止ゲート (`AtomicBool`)
//! - 再生位置を含む `Voice`（1つの `Mutex` で保護、これがオーディオロック）
//! - 完了通知（容量1のチャンネル、送信はノンブロッキング）

use crate::audio_output::AudioOutput;
use crate::clock::SampleRate;
use crate::config::PlaybackConfig;
use crate::error::Result;
use crate::source::AudioSource;
use crate::types::AudioFormat;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Finisher = Box<dyn FnOnce() + Send>;

/// 再生中のストリーム
///
/// 「ソースを再生し、その後に終了処理を1回だけ呼ぶ」という順序を表す。
pub struct Voice {
    source: AudioSource,
    finisher: Option<Finisher>,
}

impl Voice {
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            finisher: None,
        }
    }

    /// ソースを出し切った後に呼ばれる処理を登録
    pub fn then<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.finisher = Some(Box::new(f));
        self
    }

    /// `out` を埋める。足りない分は無音
    ///
    /// 最後のフレームを書き込んだ呼び出しの中で終了処理を呼ぶ。
    fn fill(&mut self, out: &mut [f32]) -> usize {
        let frames = self.source.read(out);
        let written = frames * self.source.format().channels.max(1) as usize;
        out[written..].fill(0.0);

        if self.source.is_exhausted() {
            if let Some(finish) = self.finisher.take() {
                finish();
            }
        }
        frames
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }
}

fn lock_voice(voice: &Mutex<Voice>) -> MutexGuard<'_, Voice> {
    voice.lock().unwrap_or_else(PoisonError::into_inner)
}

/// ストリームエラーの通知口
///
/// デバイスのエラーコールバックから使う。受け手がいなくてもブロックしない。
#[derive(Clone)]
pub struct ErrorSink {
    tx: Sender<String>,
}

impl ErrorSink {
    pub fn report(&self, message: String) {
        let _ = self.tx.try_send(message);
    }
}

/// ハードウェアコールバック側
///
/// 出力デバイスのデータコールバックに移動して使う。
/// 一時停止フラグを読み、オーディオロックの下でソースを進めるだけで、
/// UI やファイルには触れない。
pub struct Renderer {
    voice: Arc<Mutex<Voice>>,
    paused: Arc<AtomicBool>,
    errors: ErrorSink,
}

impl Renderer {
    /// 1バッファ分を生成
    ///
    /// 一時停止中は無音を出し、位置を進めない。
    ///
    /// # Returns
    /// 進めたフレーム数
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        if self.paused.load(Ordering::Acquire) {
            out.fill(0.0);
            return 0;
        }
        lock_voice(&self.voice).fill(out)
    }

    pub fn error_sink(&self) -> ErrorSink {
        self.errors.clone()
    }
}

/// 再生ハンドル（コントロールスレッド側）
pub struct Playback {
    voice: Arc<Mutex<Voice>>,
    paused: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    errors_rx: Receiver<String>,
    format: AudioFormat,
    total_frames: usize,
    output: Option<AudioOutput>,
}

impl Playback {
    /// WAV ファイルを開いて出力デバイスで再生を開始
    ///
    /// # Returns
    /// (再生ハンドル, 総再生時間)
    ///
    /// # Errors
    ///
    /// - `Error::Open` / `Error::Decode`: ファイルの問題
    /// - `Error::Device`: 出力デバイスを指定のレート・バッファ長で確保できない
    pub fn open<P: AsRef<Path>>(path: P, config: &PlaybackConfig) -> Result<(Self, Duration)> {
        let source = AudioSource::open(path)?;
        let duration = source.duration();

        let mut output = AudioOutput::new(&config.output_device, source.format(), config.buffer_ms)?;
        let (mut playback, renderer) = Self::attach(source);
        output.start(renderer)?;
        playback.output = Some(output);

        Ok((playback, duration))
    }

    /// デバイスを使わずにハンドルとレンダラーを組み立てる
    pub fn attach(source: AudioSource) -> (Self, Renderer) {
        let (done_tx, done_rx) = bounded::<()>(1);
        let (errors_tx, errors_rx) = bounded::<String>(1);
        let format = source.format();
        let total_frames = source.len();

        let voice = Voice::new(source).then(move || {
            let _ = done_tx.try_send(());
        });
        let voice = Arc::new(Mutex::new(voice));
        let paused = Arc::new(AtomicBool::new(false));

        let renderer = Renderer {
            voice: voice.clone(),
            paused: paused.clone(),
            errors: ErrorSink { tx: errors_tx },
        };
        let playback = Self {
            voice,
            paused,
            done_rx,
            errors_rx,
            format,
            total_frames,
            output: None,
        };
        (playback, renderer)
    }

    /// 一時停止ゲートを設定
    ///
    /// 次のバッファ境界で反映される。
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// 一時停止を切り替え、切り替え後の状態を返す
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// 現在の再生位置（フレーム）
    ///
    /// コールバックと同じオーディオロックの下で読む。
    pub fn position(&self) -> usize {
        lock_voice(&self.voice).source().position()
    }

    /// 総フレーム数
    pub fn len(&self) -> usize {
        self.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    /// 再生完了したかどうか（ノンブロッキング）
    ///
    /// 一度 true を返したら以降も true を返す。
    pub fn poll_completed(&self) -> bool {
        match self.done_rx.try_recv() {
            Ok(()) => true,
            // 終了処理が呼ばれると送信側は破棄される
            Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    /// デバイスから報告されたエラーを取り出す
    pub fn take_device_error(&self) -> Option<String> {
        self.errors_rx.try_recv().ok()
    }

    pub fn clock(&self) -> SampleRate {
        self.format.clock()
    }

    /// 出力ストリームを停止（デバイスの占有も解放される）
    pub fn stop(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.stop();
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}
