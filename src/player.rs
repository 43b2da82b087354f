//! 再生コントロールループの状態遷移
//!
//! メッセージを1つずつ `PlayerModel::update` に渡し、次に予約すべき
//! エフェクトを `Command` として受け取る。状態の変更はすべてこの関数の
//! 中で単一スレッドで行われる。ハードウェアスレッドと共有するのは
//! `Transport` 越しの一時停止ゲートと再生位置だけ。

use crate::clock::SampleRate;
use crate::config::UiConfig;
use crate::playback::Playback;
use crate::types::PlayerState;
use crate::ui_state::PlaybackUiState;

/// 再生ハンドルへのアクセス
pub trait Transport {
    /// 一時停止を切り替え、切り替え後に一時停止中なら true
    fn toggle_pause(&self) -> bool;
    /// 再生完了したか（ノンブロッキング）
    fn poll_completed(&self) -> bool;
    /// オーディオロックの下で読んだ再生位置
    fn position(&self) -> usize;
    /// 総フレーム数
    fn len(&self) -> usize;
    fn clock(&self) -> SampleRate;
    /// デバイスから報告されたエラー
    fn take_device_error(&self) -> Option<String> {
        None
    }
}

impl Transport for Playback {
    fn toggle_pause(&self) -> bool {
        Playback::toggle_pause(self)
    }

    fn poll_completed(&self) -> bool {
        Playback::poll_completed(self)
    }

    fn position(&self) -> usize {
        Playback::position(self)
    }

    fn len(&self) -> usize {
        Playback::len(self)
    }

    fn clock(&self) -> SampleRate {
        Playback::clock(self)
    }

    fn take_device_error(&self) -> Option<String> {
        Playback::take_device_error(self)
    }
}

/// コントロールループへの入力
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// q / Esc / Ctrl+C
    Quit,
    /// スペース
    TogglePause,
    /// 周期タイマー
    Tick,
    /// 端末のリサイズ（新しい幅）
    Resize(u16),
    /// プログレスバーのアニメーションフレーム
    FrameUpdate,
}

/// update の後に予約するエフェクト
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    None,
    /// 次の Tick を予約
    Tick,
    /// 次のアニメーションフレームを予約
    Frame,
    /// ループを終了
    Quit,
    Batch(Vec<Command>),
}

impl Command {
    fn contains(&self, target: &Command) -> bool {
        match self {
            Command::Batch(cmds) => cmds.iter().any(|c| c.contains(target)),
            other => other == target,
        }
    }

    pub fn schedules_tick(&self) -> bool {
        self.contains(&Command::Tick)
    }

    pub fn schedules_frame(&self) -> bool {
        self.contains(&Command::Frame)
    }

    pub fn is_quit(&self) -> bool {
        self.contains(&Command::Quit)
    }
}

pub struct PlayerModel {
    state: PlayerState,
    ui: PlaybackUiState,
    min_width: u16,
    max_width: u16,
}

impl PlayerModel {
    pub fn new(ui: PlaybackUiState, config: &UiConfig) -> Self {
        Self {
            state: PlayerState::Running,
            ui,
            min_width: config.min_width,
            max_width: config.max_width,
        }
    }

    /// 起動時のエフェクト
    pub fn init(&self) -> Command {
        Command::Tick
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn ui(&self) -> &PlaybackUiState {
        &self.ui
    }

    /// メッセージを1つ処理する
    pub fn update<T>(&mut self, msg: Message, transport: &T) -> Command
    where
        T: Transport + ?Sized,
    {
        if self.state == PlayerState::Terminating {
            return Command::None;
        }

        match msg {
            Message::Quit => self.terminate(),
            Message::TogglePause => {
                let paused = transport.toggle_pause();
                self.state = if paused {
                    PlayerState::Paused
                } else {
                    PlayerState::Running
                };
                self.ui.playing = !paused;
                Command::None
            }
            Message::Tick => self.on_tick(transport),
            Message::Resize(width) => {
                self.ui.set_width(width, self.min_width, self.max_width);
                Command::None
            }
            Message::FrameUpdate => {
                if self.ui.step_animation() {
                    Command::Frame
                } else {
                    Command::None
                }
            }
        }
    }

    fn on_tick<T>(&mut self, transport: &T) -> Command
    where
        T: Transport + ?Sized,
    {
        // 完了後はソースが閉じられている可能性があるので位置を読まない
        if transport.poll_completed() {
            self.ui.pct = 1.0;
            self.ui.shown_pct = 1.0;
            self.ui.elapsed = self.ui.total;
            return self.terminate();
        }

        if let Some(err) = transport.take_device_error() {
            log::error!("再生中にデバイスエラー: {}", err);
            self.ui.last_error = Some(err);
            return self.terminate();
        }

        if self.state == PlayerState::Paused {
            return Command::Tick;
        }

        let position = transport.position();
        let length = transport.len();
        if length > 0 {
            self.ui.pct = position as f64 / length as f64;
        }
        self.ui.elapsed = transport.clock().duration(position);

        Command::Batch(vec![Command::Frame, Command::Tick])
    }

    fn terminate(&mut self) -> Command {
        self.state = PlayerState::Terminating;
        Command::Quit
    }
}
