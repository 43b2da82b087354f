use crate::error::{Error, Result};
use crate::types::AudioFormat;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 録音用のWAVファイル書き出し
///
/// `finalize` は `self` を消費する。RIFF/data チャンクのサイズを書き戻した後に
/// サンプルが書き込まれることは型の上で起こり得ない。
pub struct WavWriter {
    path: PathBuf,
    writer: hound::WavWriter<BufWriter<fs::File>>,
    format: AudioFormat,
    samples_written: usize,
}

impl WavWriter {
    /// WAVファイルを作成
    ///
    /// 親ディレクトリが存在しない場合は作成する。
    pub fn create<P: AsRef<Path>>(path: P, format: AudioFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| Error::Open {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };

        log::info!("WAVファイル作成: {:?}", path);

        let writer = hound::WavWriter::create(&path, spec).map_err(|e| match e {
            hound::Error::IoError(source) => Error::Open {
                path: path.clone(),
                source,
            },
            other => Error::Encode(other),
        })?;

        Ok(Self {
            path,
            writer,
            format,
            samples_written: 0,
        })
    }

    /// サンプルを書き込み
    pub fn write_samples<I>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = i32>,
    {
        for sample in samples {
            self.writer.write_sample(sample).map_err(Error::Encode)?;
            self.samples_written += 1;
        }
        Ok(())
    }

    /// ヘッダのサイズフィールドを書き戻してファイルを閉じる
    ///
    /// # Returns
    /// 書き込んだサンプル数
    pub fn finalize(self) -> Result<usize> {
        let Self {
            path,
            writer,
            format,
            samples_written,
        } = self;

        writer.finalize().map_err(Error::Encode)?;
        log::info!(
            "WAVファイル書き込み完了: {:?}, {}サンプル ({:.2}秒)",
            path,
            samples_written,
            samples_written as f64 / format.sample_rate.max(1) as f64 / format.channels.max(1) as f64
        );
        Ok(samples_written)
    }

    /// 書き込んだサンプル数
    pub fn samples_written(&self) -> usize {
        self.samples_written
    }

    /// 書き込んだ時間
    pub fn duration(&self) -> Duration {
        self.format
            .clock()
            .duration(self.samples_written / self.format.channels.max(1) as usize)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
