//! キャプチャコンシューマ
//!
//! キャプチャキューと停止シグナルを `select!` で同時に待ち、届いたフレームを
//! WAV に追記する。停止時は次の順序で1回だけ後始末する:
//!
//! 1. キャプチャデバイスを停止（以後フレームは生産されない）
//! 2. 停止前にキューへ受理済みのフレームを書き出す
//! 3. WAV のヘッダを書き戻して閉じる

use crate::audio_input::AudioInput;
use crate::capture::{self, CaptureFrame, FrameConsumer};
use crate::config::Config;
use crate::error::Result;
use crate::wav_writer::WavWriter;
use crossbeam_channel::{select, Receiver};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 録音デバイスの停止口
pub trait CaptureDevice {
    /// ストリームを停止する。戻った後にコールバックは呼ばれない
    fn stop(&mut self);
}

/// 録音結果
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub path: PathBuf,
    /// 書き込んだサンプル数
    pub samples_written: usize,
    pub duration: Duration,
    /// キュー満杯で捨てたフレーム数
    pub frames_dropped: u64,
    /// 書き込みに失敗したフレーム数
    pub write_errors: u64,
}

pub struct Recorder<D: CaptureDevice> {
    device: D,
    frames: FrameConsumer,
    writer: WavWriter,
    write_errors: u64,
}

impl<D: CaptureDevice> Recorder<D> {
    pub fn new(device: D, frames: FrameConsumer, writer: WavWriter) -> Self {
        Self {
            device,
            frames,
            writer,
            write_errors: 0,
        }
    }

    /// 停止シグナルが届くまでフレームを書き込み、ファイルを確定する
    ///
    /// 停止シグナルの送信側が破棄された場合も停止として扱う。
    pub fn run(mut self, stop: &Receiver<()>) -> Result<RecordingSummary> {
        loop {
            select! {
                recv(stop) -> _ => {
                    log::info!("停止シグナルを受信しました、ファイルを保存します...");
                    break;
                }
                recv(self.frames.receiver()) -> frame => match frame {
                    Ok(frame) => self.write_frame(&frame),
                    Err(_) => {
                        log::warn!("キャプチャキューが閉じられました");
                        break;
                    }
                },
            }
        }

        self.finish()
    }

    fn write_frame(&mut self, frame: &CaptureFrame) {
        if let Err(e) = self.writer.write_samples(frame.samples_i16()) {
            // 1フレームの失敗で録音全体は止めない
            self.write_errors += 1;
            log::error!("書き込みエラー: {}", e);
        }
    }

    fn finish(mut self) -> Result<RecordingSummary> {
        self.device.stop();

        let mut drained = 0usize;
        while let Some(frame) = self.frames.try_recv() {
            self.write_frame(&frame);
            drained += 1;
        }
        if drained > 0 {
            log::debug!("停止後にキューから {} フレームを書き出しました", drained);
        }

        let frames_dropped = self.frames.dropped();
        if frames_dropped > 0 {
            log::warn!(
                "キュー満杯のため {} フレームを破棄しました",
                frames_dropped
            );
        }

        let duration = self.writer.duration();
        let path = self.writer.path().to_path_buf();
        let samples_written = self.writer.finalize()?;

        Ok(RecordingSummary {
            path,
            samples_written,
            duration,
            frames_dropped,
            write_errors: self.write_errors,
        })
    }
}

/// デフォルト入力デバイスから `path` へ録音する
///
/// デバイスの初期化、WAV ファイルの作成、ストリーム開始の順に行い、
/// どれかが失敗したら録音を始めずにエラーを返す。
pub fn record_to_file<P: AsRef<Path>>(
    path: P,
    config: &Config,
    stop: &Receiver<()>,
) -> Result<RecordingSummary> {
    let format = config.audio.recording_format();
    let (producer, consumer) = capture::channel(config.capture.queue_capacity);

    let mut input = AudioInput::new(&config.audio)?;
    let writer = WavWriter::create(path, format)?;
    input.start(producer)?;

    log::info!("録音を開始しました (Ctrl+C で停止)");

    Recorder::new(input, consumer, writer).run(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FrameProducer;
    use crate::error::Error;
    use crate::types::AudioFormat;
    use crossbeam_channel::bounded;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// 停止されたことを記録するフェイクデバイス
    struct FakeDevice {
        producer: Option<FrameProducer>,
        stopped: Arc<AtomicBool>,
    }

    impl CaptureDevice for FakeDevice {
        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
            if let Some(producer) = self.producer.take() {
                drop(producer);
            }
        }
    }

    fn read_samples(path: &Path) -> Vec<i16> {
        hound::WavReader::open(path)
            .unwrap()
            .into_samples::<i16>()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_frames_accepted_before_stop_are_written() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("drain.wav");
        let (producer, consumer) = capture::channel(16);
        let stopped = Arc::new(AtomicBool::new(false));

        for n in 0..5i16 {
            assert!(producer.push(CaptureFrame::from_samples(&[n, -n])));
        }

        let device = FakeDevice {
            producer: Some(producer),
            stopped: stopped.clone(),
        };
        let writer = WavWriter::create(&path, AudioFormat::mono_16(8000))?;

        // 停止シグナルはフレームより先に準備済み
        let (stop_tx, stop_rx) = bounded(1);
        stop_tx.send(()).unwrap();

        let summary = Recorder::new(device, consumer, writer).run(&stop_rx)?;

        assert!(stopped.load(Ordering::SeqCst));
        assert_eq!(summary.samples_written, 10);
        assert_eq!(summary.frames_dropped, 0);
        assert_eq!(
            read_samples(&path),
            [0, 0, 1, -1, 2, -2, 3, -3, 4, -4]
        );
        Ok(())
    }

    #[test]
    fn test_disconnected_stop_channel_finalizes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("closed.wav");
        let (producer, consumer) = capture::channel(4);
        producer.push(CaptureFrame::from_samples(&[7; 4]));

        let device = FakeDevice {
            producer: Some(producer),
            stopped: Arc::new(AtomicBool::new(false)),
        };
        let writer = WavWriter::create(&path, AudioFormat::mono_16(8000))?;

        let (stop_tx, stop_rx) = bounded::<()>(1);
        drop(stop_tx);

        let summary = Recorder::new(device, consumer, writer).run(&stop_rx)?;
        assert_eq!(summary.samples_written, 4);
        assert_eq!(read_samples(&path), [7, 7, 7, 7]);
        Ok(())
    }

    #[test]
    fn test_write_error_does_not_abort_recording() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("errors.wav");
        let (producer, consumer) = capture::channel(4);

        // 8bit の WAV に 16bit 値を書くと範囲外で失敗する
        let format = AudioFormat {
            sample_rate: 8000,
            channels: 1,
            bits_per_sample: 8,
        };
        producer.push(CaptureFrame::from_samples(&[1000]));
        producer.push(CaptureFrame::from_samples(&[5]));

        let device = FakeDevice {
            producer: Some(producer),
            stopped: Arc::new(AtomicBool::new(false)),
        };
        let writer = WavWriter::create(&path, format)?;
        let (stop_tx, stop_rx) = bounded(1);
        stop_tx.send(()).unwrap();

        let summary = Recorder::new(device, consumer, writer).run(&stop_rx)?;
        assert_eq!(summary.write_errors, 1);
        assert_eq!(summary.samples_written, 1);
        Ok(())
    }

    #[test]
    fn test_uncreatable_directory_is_open_error() {
        let result = WavWriter::create(
            "/proc/definitely/not/writable.wav",
            AudioFormat::mono_16(8000),
        );
        assert!(matches!(result, Err(Error::Open { .. })));
    }
}
