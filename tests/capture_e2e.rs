use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use wavecli::capture::{self, CaptureFrame, DEFAULT_QUEUE_CAPACITY};
use wavecli::error::Result;
use wavecli::recorder::{CaptureDevice, Recorder};
use wavecli::types::AudioFormat;
use wavecli::wav_writer::WavWriter;

const FRAME_SAMPLES: usize = 4410;
const FRAME_COUNT: usize = 20;

struct FakeDevice {
    stopped: Arc<AtomicBool>,
}

impl CaptureDevice for FakeDevice {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

#[test]
fn test_two_seconds_of_silence() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nested").join("silence.wav");

    let (producer, consumer) = capture::channel(DEFAULT_QUEUE_CAPACITY);
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let stopped = Arc::new(AtomicBool::new(false));

    let writer = WavWriter::create(&path, AudioFormat::mono_16(44100))?;
    let recorder = Recorder::new(
        FakeDevice {
            stopped: stopped.clone(),
        },
        consumer,
        writer,
    );

    // ハードウェアスレッドの代わり
    let hardware = thread::spawn(move || {
        let silence = vec![0u8; FRAME_SAMPLES * 2];
        for _ in 0..FRAME_COUNT {
            assert!(producer.push_bytes(&silence));
        }
        stop_tx.send(()).unwrap();
    });

    let summary = recorder.run(&stop_rx)?;
    hardware.join().unwrap();

    assert!(stopped.load(Ordering::SeqCst));
    assert_eq!(summary.samples_written, FRAME_SAMPLES * FRAME_COUNT);
    assert_eq!(summary.frames_dropped, 0);
    assert_eq!(summary.duration.as_secs(), 2);

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 88_200);

    // ヘッダのサイズがファイルと一致している
    let bytes = std::fs::read(&path)?;
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(read_u32(&bytes, 4) as usize, bytes.len() - 8);

    let data_at = bytes
        .windows(4)
        .position(|w| w == b"data")
        .expect("data chunk");
    let data_len = read_u32(&bytes, data_at + 4) as usize;
    assert_eq!(data_len, 88_200 * 2);
    assert_eq!(data_at + 8 + data_len, bytes.len());
    Ok(())
}

#[test]
fn test_samples_written_verbatim() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("ramp.wav");

    let (producer, consumer) = capture::channel(8);
    let samples: Vec<i16> = vec![i16::MIN, -1, 0, 1, i16::MAX];
    producer.push(CaptureFrame::from_samples(&samples));

    let writer = WavWriter::create(&path, AudioFormat::mono_16(8000))?;
    let (stop_tx, stop_rx) = bounded::<()>(1);
    stop_tx.send(()).unwrap();

    let device = FakeDevice {
        stopped: Arc::new(AtomicBool::new(false)),
    };
    Recorder::new(device, consumer, writer).run(&stop_rx)?;

    let written: Vec<i16> = hound::WavReader::open(&path)
        .unwrap()
        .into_samples::<i16>()
        .map(|s| s.unwrap())
        .collect();
    assert_eq!(written, samples);
    Ok(())
}
