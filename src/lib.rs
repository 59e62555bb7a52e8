#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::too_long_first_doc_paragraph
)]

//! melsec_1e
//!
//! melsec_1e は Mitsubishi FX シリーズ PLC の MC プロトコル
//! (A互換1Eフレーム, ASCIIモード) クライアントライブラリです。
//! FX3U-ENET-L などの小型 Ethernet アダプタと単一の TCP 接続で通信し、
//! ビットデバイス (X/Y) とワードデバイス (D) の読み書きを提供します。
//!
//! 主な機能:
//! - 1E ASCII フレームの組立・解析 (`frame`)
//! - TCP セッション管理と点数フィールドのバイトオーダー自動判別 (`session`)
//! - 高レベルな Read/Write 操作 (`McClient`)
//! - テスト用のモックアダプタ (別 crate `melsec_1e_mock`)
//!
//! 使い方の簡単な例:
//! ```no_run
//! // fully-qualified path to avoid relying on crate re-exports in doctests
//! use melsec_1e::client::McClient;
//! use melsec_1e::endpoint::ConnectionTarget;
//! let mut client = McClient::new().with_target(ConnectionTarget::direct("192.168.3.254", 1027));
//! // client.read_d(0, 10).await?;
//! ```
//!
//! アダプタのファームウェアによって点数フィールドのバイトオーダー
//! (big-endian / low-high swap) が異なるため、セッションが最初の
//! コマンドで両方を試し、成功した方を (コマンド, デバイス) 単位で
//! キャッシュします。

pub mod client;
pub mod commands;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod session;

pub use client::McClient;
pub use commands::Command;
pub use device::DeviceClass;
pub use endpoint::ConnectionTarget;
pub use error::Melsec1eError;
pub use frame::CountByteOrder;
