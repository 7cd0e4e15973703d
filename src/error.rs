//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 行単位・アンカー単位の失敗（画像が見つからない、バイト列が読めない等）は
//! エラーとして返さず、レポートに記録します。ここで定義するのは、抽出全体を
//! 中断させる致命的なエラーと、個別API呼び出しのエラーのみです。

use thiserror::Error;

/// xlsxpicクレート全体で使用するエラー型
///
/// # エラーの種類
///
/// - `NotAPackage`: 入力がZIPコンテナとして開けない（致命的）
/// - `Parse`: ワークシートを解析できない（calamine由来、致命的）
/// - `EntryNotFound`: パッケージ内に指定パスのエントリが存在しない
/// - `Xml`: パッケージ内のXMLパートが不正
/// - `Config`: 設定の検証に失敗
/// - `SecurityViolation`: ZIP bomb・パストラバーサル等の制限違反
/// - `Transfer`: 転送先（シンク）への保存に失敗
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxpic::{ExtractorBuilder, XlsxPicError};
///
/// let extractor = ExtractorBuilder::new().build().unwrap();
/// match extractor.extract_path("products.xlsx") {
///     Err(XlsxPicError::NotAPackage(msg)) => eprintln!("not an xlsx file: {}", msg),
///     Err(e) => eprintln!("extraction failed: {}", e),
///     Ok(report) => println!("{} images", report.images_found()),
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxPicError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークシートの解析中に発生したエラー
    ///
    /// calamineがワークブックやシートを読み込めなかった場合に発生します。
    /// 抽出全体にとって致命的です。
    #[error("Failed to parse worksheet: {0}")]
    Parse(#[from] calamine::Error),

    /// 入力がZIPコンテナ（OOXMLパッケージ）ではない
    #[error("Not an OOXML package: {0}")]
    NotAPackage(String),

    /// パッケージ内にエントリが存在しない
    #[error("Entry not found in package: {0}")]
    EntryNotFound(String),

    /// XMLパートの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ExtractorBuilder::build()`時、または存在しないシートを選択した場合に発生します。
    ///
    /// ```rust,no_run
    /// use xlsxpic::{ExtractorBuilder, XlsxPicError};
    ///
    /// let result = ExtractorBuilder::new()
    ///     .with_target_columns(["H1"])  // 無効な列名
    ///     .build();
    ///
    /// if let Err(XlsxPicError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// 転送先への保存に失敗したエラー
    #[error("Transfer failed for '{name}': {message}")]
    Transfer {
        /// 転送先でのファイル名
        name: String,
        /// エラーの詳細メッセージ
        message: String,
    },
}

impl From<zip::result::ZipError> for XlsxPicError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::FileNotFound => {
                XlsxPicError::EntryNotFound("(unnamed entry)".to_string())
            }
            zip::result::ZipError::Io(e) => XlsxPicError::Io(e),
            other => XlsxPicError::NotAPackage(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for XlsxPicError {
    fn from(err: quick_xml::Error) -> Self {
        XlsxPicError::Xml(err.to_string())
    }
}
