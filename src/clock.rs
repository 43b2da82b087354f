//! サンプルクロック
//!
//! フレーム数と実時間を固定サンプルレートで相互変換する。状態は持たない。

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// サンプリングレート (Hz)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// フレーム数を再生時間に変換
    ///
    /// サンプルレートが 0 の場合は `Duration::ZERO` を返す。
    pub fn duration(self, frames: usize) -> Duration {
        if self.0 == 0 {
            return Duration::ZERO;
        }
        let rate = self.0 as u64;
        let frames = frames as u64;
        let secs = frames / rate;
        let nanos = (frames % rate) as u128 * NANOS_PER_SEC / rate as u128;
        Duration::new(secs, nanos as u32)
    }

    /// 再生時間をフレーム数に変換（端数切り捨て）
    pub fn frames(self, duration: Duration) -> usize {
        (duration.as_nanos() * self.0 as u128 / NANOS_PER_SEC) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_of_one_second() {
        let rate = SampleRate(44100);
        assert_eq!(rate.duration(44100), Duration::from_secs(1));
        assert_eq!(rate.duration(22050), Duration::from_millis(500));
    }

    #[test]
    fn test_frames_for_buffer_period() {
        // 1/10 秒のバッファ
        assert_eq!(SampleRate(44100).frames(Duration::from_millis(100)), 4410);
        assert_eq!(SampleRate(48000).frames(Duration::from_millis(100)), 4800);
    }

    #[test]
    fn test_frames_truncates() {
        assert_eq!(SampleRate(44100).frames(Duration::from_micros(10)), 0);
        assert_eq!(SampleRate(44100).frames(Duration::from_micros(23)), 1);
    }

    #[test]
    fn test_zero_rate() {
        assert_eq!(SampleRate(0).duration(1000), Duration::ZERO);
        assert_eq!(SampleRate(0).frames(Duration::from_secs(3)), 0);
    }

    #[test]
    fn test_three_seconds() {
        let rate = SampleRate(44100);
        let frames = rate.frames(Duration::from_secs(3));
        assert_eq!(frames, 132_300);
        assert_eq!(rate.duration(frames), Duration::from_secs(3));
    }
}
