use crate::clock::SampleRate;
use crate::error::{Error, Result};
use crate::types::AudioFormat;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// デコード済みの再生用サンプルストリーム
///
/// WAV ファイル全体を開いた時点でデコードし、-1.0〜1.0 に正規化した
/// インターリーブ形式で保持する。総フレーム数は生成時に固定され、
/// 位置は `read` でのみ進む。常に `0 <= position <= len` が成り立つ。
pub struct AudioSource {
    samples: Vec<f32>,
    format: AudioFormat,
    total_frames: usize,
    position: usize,
}

impl AudioSource {
    /// WAV ファイルを開いてデコード
    ///
    /// # Errors
    ///
    /// - ファイルを開けない場合は `Error::Open`
    /// - WAV として不正な場合は `Error::Decode`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = hound::WavReader::new(BufReader::new(file))
            .map_err(|e| Error::Decode(format!("{:?}: {}", path, e)))?;

        let source = Self::from_reader(reader)?;
        log::info!(
            "WAVファイルを開きました: {:?}, {}Hz, {}ch, {}bit, {}フレーム",
            path,
            source.format.sample_rate,
            source.format.channels,
            source.format.bits_per_sample,
            source.total_frames
        );
        Ok(source)
    }

    /// hound のリーダーから全サンプルをデコード
    pub fn from_reader<R: Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(Error::Decode(format!(
                "不正なフォーマット: {}Hz, {}ch",
                spec.sample_rate, spec.channels
            )));
        }

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(Error::decode)?;

        let format = AudioFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
        };
        Ok(Self::from_samples(samples, format))
    }

    /// 正規化済みのインターリーブサンプルから生成
    ///
    /// 末尾の不完全なフレームは捨てる。
    pub fn from_samples(mut samples: Vec<f32>, format: AudioFormat) -> Self {
        let channels = format.channels.max(1) as usize;
        let total_frames = samples.len() / channels;
        samples.truncate(total_frames * channels);
        Self {
            samples,
            format,
            total_frames,
            position: 0,
        }
    }

    /// 総フレーム数
    pub fn len(&self) -> usize {
        self.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }

    /// 現在の再生位置（フレーム）
    pub fn position(&self) -> usize {
        self.position
    }

    /// 末尾まで読み切ったかどうか
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.total_frames
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn clock(&self) -> SampleRate {
        self.format.clock()
    }

    /// 総再生時間
    pub fn duration(&self) -> Duration {
        self.clock().duration(self.total_frames)
    }

    /// インターリーブされた `out` に次のフレームを書き込む
    ///
    /// # Returns
    /// 書き込んだフレーム数。`out` の残りには触れない。
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let channels = self.format.channels.max(1) as usize;
        let frames = (out.len() / channels).min(self.total_frames - self.position);
        let start = self.position * channels;
        let count = frames * channels;
        out[..count].copy_from_slice(&self.samples[start..start + count]);
        self.position += frames;
        frames
    }
}
