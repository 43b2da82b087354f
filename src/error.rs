//! エラー型
//!
//! 起動時エラー (Open / Decode / Device / Config) は UI を表示する前に
//! 報告されてプロセスは非ゼロで終了する。録音中の Encode エラーは
//! ログに出して処理を継続する。

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// ファイルが存在しない、または読み込めない
    #[error("ファイルを開けません: {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// WAV コンテナとして不正
    #[error("WAV のデコードに失敗: {0}")]
    Decode(String),

    /// オーディオデバイスの確保・初期化・ストリームの失敗
    #[error("オーディオデバイスエラー: {0}")]
    Device(String),

    /// 録音中の書き込み失敗
    #[error("WAV の書き込みに失敗: {0}")]
    Encode(#[source] hound::Error),

    /// 必須引数の欠落や設定ファイルの不備
    #[error("設定エラー: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn device(err: impl Display) -> Self {
        Error::Device(err.to_string())
    }

    pub fn decode(err: impl Display) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
