//! キャプチャリレー
//!
//! 録音コールバックからコンシューマへの有界・ロッシーなキュー。
//! 生産側（ハードウェアスレッド）は決してブロックしない。キューが満杯なら
//! 新しいフレームを捨てて先に進む。消費側は厳密な FIFO 順で取り出す。

use crate::types::SampleI16;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// キューの既定容量（フレーム数）
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// 録音された1バッファ分の生データ
///
/// ハードウェアのバッファはコールバックから戻ると再利用されるため、
/// 必ずコピーして所有する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureFrame {
    bytes: Vec<u8>,
}

impl CaptureFrame {
    /// ハードウェアバッファをコピーして生成
    pub fn copy_from(data: &[u8]) -> Self {
        Self {
            bytes: data.to_vec(),
        }
    }

    /// 16bit サンプルをリトルエンディアンで詰めて生成
    pub fn from_samples(samples: &[SampleI16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 含まれるサンプル数
    pub fn sample_count(&self, bytes_per_sample: usize) -> usize {
        if bytes_per_sample == 0 {
            return 0;
        }
        self.bytes.len() / bytes_per_sample
    }

    /// リトルエンディアンの符号付き16bitとして読み、i32 に符号拡張する
    ///
    /// クリップ・スケーリング・ディザは行わない。末尾の半端なバイトは無視する。
    pub fn samples_i16(&self) -> impl Iterator<Item = i32> + '_ {
        self.bytes
            .chunks_exact(2)
            .map(|pair| SampleI16::from_le_bytes([pair[0], pair[1]]) as i32)
    }
}

impl From<Vec<u8>> for CaptureFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// 有界キューを作成
///
/// # Returns
/// (生産側, 消費側)
pub fn channel(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        FrameProducer {
            tx,
            dropped: dropped.clone(),
        },
        FrameConsumer { rx, dropped },
    )
}

/// 生産側（ハードウェアスレッドで使う）
#[derive(Clone)]
pub struct FrameProducer {
    tx: Sender<CaptureFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameProducer {
    /// ノンブロッキングでキューに積む
    ///
    /// 満杯ならこのフレームを捨てて false を返す。ログは出さない。
    pub fn push(&self, frame: CaptureFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// ハードウェアバッファをコピーして積む
    pub fn push_bytes(&self, data: &[u8]) -> bool {
        self.push(CaptureFrame::copy_from(data))
    }
}

/// 消費側
pub struct FrameConsumer {
    rx: Receiver<CaptureFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameConsumer {
    /// `select!` で待つための受信チャンネル
    pub fn receiver(&self) -> &Receiver<CaptureFrame> {
        &self.rx
    }

    pub fn try_recv(&self) -> Option<CaptureFrame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// 満杯で捨てられたフレーム数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: u8) -> CaptureFrame {
        CaptureFrame::copy_from(&[n, 0])
    }

    #[test]
    fn test_overflow_drops_newest() {
        let (producer, consumer) = channel(4);

        let accepted: Vec<bool> = (0..10).map(|n| producer.push(numbered(n))).collect();
        assert_eq!(accepted, [true, true, true, true, false, false, false, false, false, false]);
        assert_eq!(consumer.dropped(), 6);

        let received: Vec<u8> = std::iter::from_fn(|| consumer.try_recv())
            .map(|f| f.as_bytes()[0])
            .collect();
        assert_eq!(received, [0, 1, 2, 3]);
    }

    #[test]
    fn test_survivors_keep_order_with_gaps() {
        let (producer, consumer) = channel(3);
        let mut received = Vec::new();

        // 生産 10 件ごとに 2 件だけ消費する
        for n in 0..100u8 {
            producer.push(numbered(n));
            if n % 10 == 9 {
                for _ in 0..2 {
                    if let Some(frame) = consumer.try_recv() {
                        received.push(frame.as_bytes()[0]);
                    }
                }
            }
        }
        received.extend(std::iter::from_fn(|| consumer.try_recv()).map(|f| f.as_bytes()[0]));

        assert!(!received.is_empty());
        assert!(received.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(received.len() as u64 + consumer.dropped(), 100);
    }

    #[test]
    fn test_frame_is_copied() {
        let mut hardware_buffer = vec![1u8, 2, 3, 4];
        let frame = CaptureFrame::copy_from(&hardware_buffer);

        // ハードウェア側がバッファを再利用しても影響しない
        hardware_buffer.fill(0);
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_samples_sign_extended() {
        let frame = CaptureFrame::copy_from(&[0xff, 0xff, 0x00, 0x80, 0xff, 0x7f, 0x34, 0x12]);
        let samples: Vec<i32> = frame.samples_i16().collect();
        assert_eq!(samples, [-1, -32768, 32767, 0x1234]);
        assert_eq!(frame.sample_count(2), 4);
    }

    #[test]
    fn test_trailing_odd_byte_ignored() {
        let frame = CaptureFrame::copy_from(&[0x01, 0x00, 0x02]);
        assert_eq!(frame.samples_i16().collect::<Vec<_>>(), [1]);
        assert_eq!(frame.sample_count(2), 1);
    }

    #[test]
    fn test_from_samples_round_trip() {
        let frame = CaptureFrame::from_samples(&[-2, 300]);
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.samples_i16().collect::<Vec<_>>(), [-2, 300]);
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (producer, consumer) = channel(2);
        drop(consumer);
        assert!(!producer.push_bytes(&[0, 0]));
    }
}
