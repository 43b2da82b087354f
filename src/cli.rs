use crate::error::{Error, Result};
use std::path::PathBuf;

/// サブコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// WAV ファイルを再生する
    Play(PathBuf),
    /// 既定の入力デバイスから録音する
    Record(PathBuf),
    /// デバイス一覧を表示する
    Devices,
    /// 既定の設定ファイルを書き出す
    GenerateConfig(PathBuf),
    /// `-h` / `--help` / `help`
    Help,
    /// 引数なし
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub action: Action,
}

/// コマンドライン引数（プログラム名を除く）を解釈する
pub fn parse<I, S>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut config_path = None;

    let action = loop {
        let Some(arg) = args.next() else {
            break Action::Usage;
        };

        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| Error::Config(format!("--config にパスがありません\n\n{}", usage())))?;
                config_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" | "help" => break Action::Help,
            "devices" => break Action::Devices,
            "generate-config" => {
                let path = args.next().unwrap_or_else(|| "config.toml".to_string());
                break Action::GenerateConfig(PathBuf::from(path));
            }
            "play" => break Action::Play(required_path(args.next(), "play")?),
            "record" => break Action::Record(required_path(args.next(), "record")?),
            // それ以外はファイルパスとみなして再生する
            _ => break Action::Play(PathBuf::from(arg)),
        }
    };

    Ok(Invocation {
        config_path,
        action,
    })
}

fn required_path(arg: Option<String>, command: &str) -> Result<PathBuf> {
    arg.map(PathBuf::from).ok_or_else(|| {
        Error::Config(format!(
            "{} にはファイルパスが必要です\n\n{}",
            command,
            usage()
        ))
    })
}

/// 使い方
pub fn usage() -> String {
    let name = env!("CARGO_PKG_NAME");
    format!(
        "Usage:\n  \
         {name} [--config <path>] play <file.wav>     WAV ファイルを再生\n  \
         {name} [--config <path>] <file.wav>          play と同じ\n  \
         {name} [--config <path>] record <file.wav>   録音 (Ctrl+C で停止)\n  \
         {name} devices                               デバイス一覧\n  \
         {name} generate-config [path]                設定ファイルを生成\n  \
         {name} help                                  このメッセージ\n\n\
         再生中: space で一時停止/再開, q / Esc で終了"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: &[&str]) -> Action {
        parse(args.iter().copied()).unwrap().action
    }

    #[test]
    fn test_play_and_bare_path() {
        assert_eq!(action(&["play", "a.wav"]), Action::Play("a.wav".into()));
        assert_eq!(action(&["a.wav"]), Action::Play("a.wav".into()));
    }

    #[test]
    fn test_record() {
        assert_eq!(action(&["record", "out.wav"]), Action::Record("out.wav".into()));
    }

    #[test]
    fn test_help_and_usage() {
        for flag in ["-h", "--help", "help"] {
            assert_eq!(action(&[flag]), Action::Help);
        }
        assert_eq!(action(&[]), Action::Usage);
    }

    #[test]
    fn test_missing_path_is_config_error() {
        for command in ["play", "record"] {
            let err = parse([command]).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
        assert!(matches!(parse(["--config"]), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_option() {
        let invocation = parse(["--config", "my.toml", "record", "x.wav"]).unwrap();
        assert_eq!(invocation.config_path, Some(PathBuf::from("my.toml")));
        assert_eq!(invocation.action, Action::Record("x.wav".into()));

        // オプションだけならコマンドなし
        assert_eq!(action(&["--config", "my.toml"]), Action::Usage);
    }

    #[test]
    fn test_generate_config_default_path() {
        assert_eq!(
            action(&["generate-config"]),
            Action::GenerateConfig("config.toml".into())
        );
        assert_eq!(
            action(&["generate-config", "alt.toml"]),
            Action::GenerateConfig("alt.toml".into())
        );
    }
}
