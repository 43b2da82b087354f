use crate::clock::SampleRate;

/// 16ビット整数型のオーディオサンプル
///
/// PCM形式の音声データを表現するための型エイリアス。
/// -32768 から 32767 の範囲の値を取る。
pub type SampleI16 = i16;

/// オーディオフォーマット情報
///
/// 音声データのサンプリングレート、チャンネル数、量子化ビット数を保持する。
///
/// # Examples
///
/// ```
/// # use wavecli::types::AudioFormat;
/// let format = AudioFormat::mono_16(44100);
/// assert_eq!(format.channels, 1);
/// assert_eq!(format.bytes_per_sample(), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// サンプリングレート (Hz)
    ///
    /// 典型的な値: 8000, 16000, 44100, 48000
    pub sample_rate: u32,

    /// チャンネル数
    ///
    /// 1: モノラル, 2: ステレオ
    pub channels: u16,

    /// 1サンプルあたりのビット数
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// 16bit 符号付き整数のモノラルフォーマット（録音用）
    pub fn mono_16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    /// 1サンプルあたりのバイト数
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    /// サンプルクロック
    pub fn clock(&self) -> SampleRate {
        SampleRate(self.sample_rate)
    }
}

/// 再生コントロールループの状態
///
/// `Running` から始まり、`Terminating` に入ったら二度と抜けない。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// 再生中
    Running,
    /// 一時停止中
    Paused,
    /// 終了処理中（終端状態）
    Terminating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_creation() {
        let format = AudioFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 24,
        };
        assert_eq!(format.sample_rate, 48000);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bytes_per_sample(), 3);
    }

    #[test]
    fn test_mono_16() {
        let format = AudioFormat::mono_16(44100);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.bytes_per_sample(), 2);
        assert_eq!(format.clock(), SampleRate(44100));
    }
}
