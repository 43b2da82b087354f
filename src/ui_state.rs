use std::time::Duration;

/// プログレスバーが表示値に追いついたとみなす差
const SETTLE_EPSILON: f64 = 0.001;

/// 1フレームで縮める差の割合
const EASING: f64 = 0.5;

/// 再生画面の状態（TUI表示用）
///
/// コントロールループだけが変更し、描画側は読むだけ。
#[derive(Clone, Debug)]
pub struct PlaybackUiState {
    /// ファイル名
    pub filename: String,
    /// 再生中なら true、一時停止中なら false
    pub playing: bool,
    /// 再生済みの割合 (0.0〜1.0)
    pub pct: f64,
    /// プログレスバーに表示中の割合（`pct` に向かってアニメーションする）
    pub shown_pct: f64,
    /// 経過時間
    pub elapsed: Duration,
    /// 総再生時間
    pub total: Duration,
    /// プログレスバーの幅
    pub bar_width: u16,
    /// 最後に発生したエラー
    pub last_error: Option<String>,
}

impl PlaybackUiState {
    pub fn new(filename: impl Into<String>, total: Duration) -> Self {
        Self {
            filename: filename.into(),
            playing: true,
            pct: 0.0,
            shown_pct: 0.0,
            elapsed: Duration::ZERO,
            total,
            bar_width: 40,
            last_error: None,
        }
    }

    /// 端末幅からプログレスバーの幅を決める
    ///
    /// 左右の余白 10 桁を引き、`[min, max]` に収める。
    pub fn set_width(&mut self, terminal_width: u16, min: u16, max: u16) {
        self.bar_width = terminal_width.saturating_sub(10).clamp(min, max);
    }

    /// 表示値を目標値に一歩近づける
    ///
    /// # Returns
    /// まだ追いついていなければ true
    pub fn step_animation(&mut self) -> bool {
        let diff = self.pct - self.shown_pct;
        if diff.abs() < SETTLE_EPSILON {
            self.shown_pct = self.pct;
            false
        } else {
            self.shown_pct += diff * EASING;
            true
        }
    }

    /// 状態表示の文字列
    pub fn status_label(&self) -> &'static str {
        if self.playing {
            "▶ Playing"
        } else {
            "⏸ Paused "
        }
    }

    /// "00:15 / 03:40" 形式の時間表示
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_mmss(self.elapsed),
            format_mmss(self.total)
        )
    }
}

/// 秒に丸めて mm:ss 形式にする（1時間以上は分が 60 を超える）
pub fn format_mmss(duration: Duration) -> String {
    let secs = duration.as_secs_f64().round() as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
