use crate::device::{self, DeviceLease};
use crate::error::{Error, Result};
use crate::playback::Renderer;
use crate::types::AudioFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};

/// 音声出力デバイスマネージャ
///
/// 生成時にデバイスの占有権を取得し、ドロップ時に解放する。
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    _lease: DeviceLease,
}

impl AudioOutput {
    /// 新しいAudioOutputを作成
    ///
    /// # Arguments
    /// * `device_name` - 出力デバイス名。"default" ならシステムのデフォルト
    /// * `format` - 再生するソースのフォーマット
    /// * `buffer_ms` - ハードウェアバッファ長
    pub fn new(device_name: &str, format: AudioFormat, buffer_ms: u32) -> Result<Self> {
        let lease = DeviceLease::acquire()?;
        let host = cpal::default_host();

        // デバイスを選択
        let device = if device_name == "default" {
            host.default_output_device().ok_or_else(|| {
                Error::Device("デフォルト出力デバイスが見つかりません".to_string())
            })?
        } else {
            host.output_devices()
                .map_err(Error::device)?
                .find(|d| d.name().map(|n| n == device_name).unwrap_or(false))
                .ok_or_else(|| {
                    Error::Device(format!("出力デバイス '{}' が見つかりません", device_name))
                })?
        };

        log::info!("出力デバイス: {}", device.name().map_err(Error::device)?);

        // デバイスのデフォルト設定を取得してサンプルフォーマットを確認
        let default_config = device.default_output_config().map_err(|e| {
            Error::Device(format!("デフォルト出力設定が取得できません: {}", e))
        })?;

        log::info!(
            "出力デバイス設定: {:?}, {}Hz, {}ch",
            default_config.sample_format(),
            default_config.sample_rate().0,
            default_config.channels()
        );

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: device::buffer_size(format.sample_rate, buffer_ms),
        };

        Ok(Self {
            device,
            config,
            sample_format: default_config.sample_format(),
            stream: None,
            _lease: lease,
        })
    }

    /// デバイス一覧を表示
    pub fn list_devices() -> Result<()> {
        let host = cpal::default_host();
        println!("=== 利用可能な出力デバイス ===");

        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        for (idx, device) in host.output_devices().map_err(Error::device)?.enumerate() {
            let name = device.name().map_err(Error::device)?;
            let marker = if default_name.as_deref() == Some(name.as_str()) {
                " (デフォルト)"
            } else {
                ""
            };
            println!("{}. {}{}", idx, name, marker);

            if let Ok(config) = device.default_output_config() {
                println!(
                    "   サンプルレート: {} Hz, チャンネル数: {}",
                    config.sample_rate().0,
                    config.channels()
                );
            }
        }

        Ok(())
    }

    /// 音声ストリームを開始
    ///
    /// `renderer` はデータコールバックに移動し、以後ハードウェアスレッドから呼ばれる。
    pub fn start(&mut self, renderer: Renderer) -> Result<()> {
        log::info!(
            "出力ストリーム開始: サンプルレート={}Hz, チャンネル={}, バッファ={:?}",
            self.config.sample_rate.0,
            self.config.channels,
            self.config.buffer_size
        );

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(renderer)?,
            SampleFormat::I16 => self.build_stream::<i16>(renderer)?,
            SampleFormat::U16 => self.build_stream::<u16>(renderer)?,
            SampleFormat::I32 => self.build_stream::<i32>(renderer)?,
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
        Ok(())
    }

    /// 指定されたサンプルフォーマットで出力ストリームを構築
    fn build_stream<T>(&self, mut renderer: Renderer) -> Result<Stream>
    where
        T: SizedSample + Sample + FromSample<f32> + Send + 'static,
    {
        let errors = renderer.error_sink();

        // コールバック内での確保を避けるため、想定バッファ長で先に確保しておく
        let capacity = match self.config.buffer_size {
            cpal::BufferSize::Fixed(frames) => frames as usize * self.config.channels as usize,
            cpal::BufferSize::Default => 0,
        };
        let mut scratch: Vec<f32> = Vec::with_capacity(capacity);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    renderer.render(&mut scratch);
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                },
                move |err| {
                    errors.report(err.to_string());
                },
                None,
            )
            .map_err(|e| Error::Device(format!("出力ストリームの構築に失敗: {}", e)))?;

        Ok(stream)
    }

    /// 音声ストリームを停止
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("出力ストリームを停止しました");
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
