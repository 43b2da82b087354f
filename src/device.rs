//! デバイスバインディングの共通部分
//!
//! プロセス全体で同時に有効なオーディオストリームは1本だけ。
//! `DeviceLease` がその占有権を表し、ドロップ時に必ず解放される。

use crate::clock::SampleRate;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static STREAM_ACTIVE: AtomicBool = AtomicBool::new(false);

/// アクティブなオーディオストリームの占有権
#[derive(Debug)]
pub struct DeviceLease {
    _private: (),
}

impl DeviceLease {
    /// 占有権を取得
    ///
    /// 既に別のストリームが占有している場合は `Error::Device` を返す。
    pub fn acquire() -> Result<Self> {
        STREAM_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { _private: () })
            .map_err(|_| Error::Device("別のオーディオストリームが使用中です".to_string()))
    }

    /// 占有中かどうか
    pub fn is_held() -> bool {
        STREAM_ACTIVE.load(Ordering::Acquire)
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        STREAM_ACTIVE.store(false, Ordering::Release);
    }
}

/// バッファ長 (ms) から固定バッファサイズを決める
///
/// 1/10 秒のバッファで約 100ms のレイテンシを狙う。
pub fn buffer_size(sample_rate: u32, buffer_ms: u32) -> cpal::BufferSize {
    let frames = SampleRate(sample_rate).frames(Duration::from_millis(buffer_ms as u64));
    cpal::BufferSize::Fixed(frames.max(1) as cpal::FrameCount)
}
