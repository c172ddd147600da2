//! Sortie のクライアントコア。
//!
//! 会話一覧の組み立て、フォロー・保存の楽観的トグル、イベントのクライアント側検索を提供する。
//! 永続化・認証・ストレージ・リアルタイム配信はポート越しに扱い、
//! `infrastructure` にローカル SQLite ベースの実装を同梱する。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use shared::{AppConfig, AppError, Result};
pub use state::{AppPorts, AppState};

/// `RUST_LOG` が無ければ `sortie=debug,info` で初期化する。二重初期化はエラーを返す。
pub fn init_logging() -> std::result::Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sortie=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
