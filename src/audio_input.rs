use crate::capture::{CaptureFrame, FrameProducer};
use crate::config::AudioConfig;
use crate::device::{self, DeviceLease};
use crate::error::{Error, Result};
use crate::recorder::CaptureDevice;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

/// オーディオデバイスからの録音入力
///
/// 生成時にデバイスの占有権を取得し、ドロップ時に解放する。
pub struct AudioInput {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    stream: Option<cpal::Stream>,
    _lease: DeviceLease,
}

impl AudioInput {
    /// 新しいAudioInputを作成
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let lease = DeviceLease::acquire()?;
        let host = cpal::default_host();

        log::info!("設定: {:?}", config);

        // デバイスを取得
        let device = if config.device_id == "default" {
            host.default_input_device().ok_or_else(|| {
                Error::Device("デフォルト入力デバイスが見つかりません".to_string())
            })?
        } else {
            host.input_devices()
                .map_err(Error::device)?
                .find(|d| d.name().ok().as_deref() == Some(config.device_id.as_str()))
                .ok_or_else(|| {
                    Error::Device(format!("デバイスが見つかりません: {}", config.device_id))
                })?
        };

        log::info!("入力デバイス: {:?}", device.name());

        // デバイスの設定を取得
        let default_config = device.default_input_config().map_err(|e| {
            Error::Device(format!("デフォルト入力設定が取得できません: {}", e))
        })?;

        log::info!(
            "デバイス設定: {:?}, {}Hz, {}ch",
            default_config.sample_format(),
            default_config.sample_rate().0,
            default_config.channels()
        );

        // ストリーム設定を作成
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: device::buffer_size(config.sample_rate, config.buffer_ms),
        };

        Ok(Self {
            device,
            config: stream_config,
            sample_format: default_config.sample_format(),
            stream: None,
            _lease: lease,
        })
    }

    /// ストリームを開始
    ///
    /// # Arguments
    /// * `producer` - キャプチャキューの生産側。コールバックに移動する
    pub fn start(&mut self, producer: FrameProducer) -> Result<()> {
        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(producer)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(producer)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(producer)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(producer)?,
            other => {
                return Err(Error::Device(format!(
                    "サポートされていないサンプルフォーマット: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::Device(format!("ストリームの再生開始に失敗: {}", e)))?;
        self.stream = Some(stream);

        log::info!("音声入力ストリームを開始しました");

        Ok(())
    }

    /// ストリームを構築
    fn build_stream<T>(&self, producer: FrameProducer) -> Result<cpal::Stream>
    where
        T: SizedSample + Sample + Send + 'static,
        i16: FromSample<T>,
    {
        let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
            // data はコールバックから戻ると再利用されるのでここでコピーする
            let mut bytes = Vec::with_capacity(data.len() * 2);
            for &sample in data {
                let value: i16 = sample.to_sample();
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            producer.push(CaptureFrame::from(bytes));
        };

        let error_callback = move |err| {
            log::error!("ストリームエラー: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(&self.config, data_callback, error_callback, None)
            .map_err(|e| Error::Device(format!("入力ストリームの構築に失敗: {}", e)))?;

        Ok(stream)
    }

    /// ストリームを停止
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("音声入力ストリームを停止しました");
        }
    }

    /// デバイス一覧を表示
    pub fn list_devices() -> Result<()> {
        let host = cpal::default_host();
        println!("=== 利用可能な入力デバイス ===");

        for (idx, device) in host.input_devices().map_err(Error::device)?.enumerate() {
            let name = device.name().map_err(Error::device)?;
            println!("{}. {}", idx, name);

            if let Ok(configs) = device.supported_input_configs() {
                for config_range in configs {
                    println!(
                        "   フォーマット: {:?}, {}-{}Hz, {}ch",
                        config_range.sample_format(),
                        config_range.min_sample_rate().0,
                        config_range.max_sample_rate().0,
                        config_range.channels()
                    );
                }
            }
        }

        Ok(())
    }
}

impl CaptureDevice for AudioInput {
    fn stop(&mut self) {
        AudioInput::stop(self);
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}
