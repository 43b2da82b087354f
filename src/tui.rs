use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::player::{Command, Message, PlayerModel, Transport};
use crate::ui_state::PlaybackUiState;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// アニメーションフレームの間隔（約 60fps）
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// キー入力の解釈結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Send(Message),
    /// Ctrl+Z
    Suspend,
}

/// キーをコントロールループへの入力に変換
pub fn map_key(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(KeyAction::Send(Message::Quit)),
        KeyCode::Char('z') if ctrl => Some(KeyAction::Suspend),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Send(Message::Quit)),
        KeyCode::Char(' ') => Some(KeyAction::Send(Message::TogglePause)),
        _ => None,
    }
}

/// raw モードと代替スクリーンを保持し、ドロップ時に必ず元に戻す
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }

    /// Ctrl+Z でプロセスを一時停止し、再開後に端末を戻す
    fn suspend(&self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            let _ = signal::raise(Signal::SIGTSTP);
        }

        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// 次に発火させる予定
#[derive(Default)]
struct Schedule {
    tick: Option<Instant>,
    frame: Option<Instant>,
    quit: bool,
}

impl Schedule {
    fn apply(&mut self, cmd: Command, tick_interval: Duration) {
        match cmd {
            Command::None => {}
            Command::Tick => self.tick = Some(Instant::now() + tick_interval),
            Command::Frame => {
                // アニメーション中に Tick から来たフレーム要求は重ねない
                if self.frame.is_none() {
                    self.frame = Some(Instant::now() + FRAME_INTERVAL);
                }
            }
            Command::Quit => self.quit = true,
            Command::Batch(cmds) => {
                for cmd in cmds {
                    self.apply(cmd, tick_interval);
                }
            }
        }
    }

    /// 次の締め切りまでの待ち時間
    fn timeout(&self, fallback: Duration) -> Duration {
        let next = match (self.tick, self.frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        next.map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(fallback)
    }

    fn take_due_tick(&mut self, now: Instant) -> bool {
        Self::take_due(&mut self.tick, now)
    }

    fn take_due_frame(&mut self, now: Instant) -> bool {
        Self::take_due(&mut self.frame, now)
    }

    fn take_due(slot: &mut Option<Instant>, now: Instant) -> bool {
        match slot {
            Some(at) if *at <= now => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

/// 再生画面
pub struct TuiApp<'a, T: Transport + ?Sized> {
    model: PlayerModel,
    transport: &'a T,
    tick_interval: Duration,
    interrupt: Option<Receiver<()>>,
}

impl<'a, T: Transport + ?Sized> TuiApp<'a, T> {
    pub fn new(model: PlayerModel, transport: &'a T, config: &PlaybackConfig) -> Self {
        Self {
            model,
            transport,
            tick_interval: Duration::from_millis(config.tick_ms),
            interrupt: None,
        }
    }

    /// SIGINT / SIGTERM の通知を受け取るチャンネルを登録
    ///
    /// 通知が届くと q キーと同じく `Message::Quit` を送る。
    pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// TUIを起動し、終了するまでブロックする
    ///
    /// 再生中にデバイスエラーが起きた場合はエラー画面を表示し、
    /// キー入力を待ってから `Error::Device` を返す。
    pub fn run(&mut self) -> Result<()> {
        let guard = TerminalGuard::enter()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

        let size = terminal.size()?;
        self.dispatch(Message::Resize(size.width));

        let mut schedule = Schedule::default();
        schedule.apply(self.model.init(), self.tick_interval);

        while !schedule.quit {
            if self.check_interrupt(&mut schedule) {
                break;
            }
            terminal.draw(|f| draw(f, self.model.ui()))?;

            if event::poll(schedule.timeout(self.tick_interval))? {
                match event::read()? {
                    Event::Key(key) => match map_key(key) {
                        Some(KeyAction::Send(msg)) => {
                            let cmd = self.dispatch(msg);
                            schedule.apply(cmd, self.tick_interval);
                        }
                        Some(KeyAction::Suspend) => {
                            guard.suspend()?;
                            terminal.clear()?;
                        }
                        None => {}
                    },
                    Event::Resize(width, _) => {
                        let cmd = self.dispatch(Message::Resize(width));
                        schedule.apply(cmd, self.tick_interval);
                    }
                    _ => {}
                }
            }

            let now = Instant::now();
            if schedule.take_due_tick(now) {
                let cmd = self.dispatch(Message::Tick);
                schedule.apply(cmd, self.tick_interval);
            }
            if schedule.take_due_frame(now) {
                let cmd = self.dispatch(Message::FrameUpdate);
                schedule.apply(cmd, self.tick_interval);
            }
        }

        if let Some(err) = self.model.ui().last_error.clone() {
            terminal.draw(|f| draw(f, self.model.ui()))?;
            wait_for_key()?;
            return Err(Error::Device(err));
        }

        terminal.draw(|f| draw(f, self.model.ui()))?;
        Ok(())
    }

    /// 割り込みが届いていれば終了を予約する
    fn check_interrupt(&mut self, schedule: &mut Schedule) -> bool {
        let interrupted = self
            .interrupt
            .as_ref()
            .is_some_and(|rx| rx.try_recv().is_ok());
        if interrupted {
            log::info!("停止シグナルを受信しました");
            let cmd = self.dispatch(Message::Quit);
            schedule.apply(cmd, self.tick_interval);
        }
        schedule.quit
    }

    fn dispatch(&mut self, msg: Message) -> Command {
        self.model.update(msg, self.transport)
    }
}

fn wait_for_key() -> io::Result<()> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

/// 画面を描画
pub fn draw(f: &mut Frame, ui: &PlaybackUiState) {
    let block = Block::default().title("wavecli").borders(Borders::ALL);
    let inner = block.inner(f.area());
    f.render_widget(block, f.area());

    if let Some(err) = &ui.last_error {
        draw_error(f, inner, err);
        return;
    }

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // ファイル名
            Constraint::Length(1), // 状態
            Constraint::Length(1), // プログレスバー
            Constraint::Length(1), // 時間
            Constraint::Length(1),
            Constraint::Length(1), // 操作説明
            Constraint::Min(0),
        ])
        .split(inner);

    let title = Paragraph::new(Span::styled(
        ui.filename.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    f.render_widget(title, sections[0]);

    let status_color = if ui.playing { Color::Green } else { Color::Yellow };
    let status = Paragraph::new(Span::styled(
        ui.status_label(),
        Style::default().fg(status_color),
    ));
    f.render_widget(status, sections[1]);

    draw_progress(f, sections[2], ui);

    f.render_widget(Paragraph::new(ui.time_label()), sections[3]);

    let help = Paragraph::new(Line::from(vec![
        Span::styled("space", Style::default().fg(Color::Cyan)),
        Span::raw(" pause/resume  "),
        Span::styled("q", Style::default().fg(Color::Cyan)),
        Span::raw(" quit"),
    ]))
    .style(Style::default().fg(Color::Gray));
    f.render_widget(help, sections[5]);
}

fn draw_progress(f: &mut Frame, area: Rect, ui: &PlaybackUiState) {
    let area = Rect {
        width: ui.bar_width.min(area.width),
        ..area
    };
    let ratio = ui.shown_pct.clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .label(format!("{:.0}%", ratio * 100.0))
        .ratio(ratio);
    f.render_widget(gauge, area);
}

fn draw_error(f: &mut Frame, area: Rect, err: &str) {
    let lines = vec![
        Line::from(Span::styled(
            "デバイスエラーのため再生を中断しました",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(err.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "何かキーを押すと終了します",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}
