//! # Tsunami Notify 送信バッチ
//!
//! 未送信の通知をテンプレートでレンダリングしてメール送信するバッチ処理。
//! バイナリ `send-notifications` とテスト用に、内部モジュールへのアクセスを提供する。

pub mod config;
pub mod error;
pub mod runner;
pub mod usecase;

// テストユーティリティ（内部実装、ドキュメントからは隠す）
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
