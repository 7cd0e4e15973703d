//! Builder Module
//!
//! Fluent Builder APIを提供し、`Extractor`インスタンスを段階的に構築する。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::api::{MatchMode, ReferenceVocabulary, SheetSelector};
use crate::engine::ExtractionSession;
use crate::error::XlsxPicError;
use crate::report::ExtractionReport;
use crate::types::column_index;

/// 既定の対象列
const DEFAULT_TARGET_COLUMN: &str = "H";

/// 既定の隣接列の幅（A列からB..H列）
const DEFAULT_ADJACENT_SPAN: u32 = 7;

/// 抽出処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ExtractionConfig {
    /// シート選択方式
    pub sheet: SheetSelector,

    /// 画像を配置する対象列（0始まり）
    pub target_columns: Vec<u32>,

    /// 参照列（0始まり）。`None`の場合は自動検出
    pub reference_column: Option<u32>,

    /// データ開始行（1始まり）。`None`の場合は自動検出
    pub start_row: Option<u32>,

    pub match_mode: MatchMode,

    /// 隣接セル戦略で参照列の右側に調べる列数
    pub adjacent_span: u32,

    pub vocabulary: ReferenceVocabulary,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::default(),
            target_columns: vec![7],
            reference_column: None,
            start_row: None,
            match_mode: MatchMode::default(),
            adjacent_span: DEFAULT_ADJACENT_SPAN,
            vocabulary: ReferenceVocabulary::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
/// 列名は文字列で受け取り、`build()`時にまとめて検証します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxpic::{ExtractorBuilder, MatchMode};
///
/// # fn main() -> Result<(), xlsxpic::XlsxPicError> {
/// let extractor = ExtractorBuilder::new()
///     .with_target_columns(["H", "I"])
///     .with_reference_column("A")
///     .with_start_row(4)
///     .with_match_mode(MatchMode::Loose)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorBuilder {
    sheet: SheetSelector,
    target_columns: Vec<String>,
    reference_column: Option<String>,
    start_row: Option<u32>,
    match_mode: MatchMode,
    adjacent_span: u32,
    vocabulary: ReferenceVocabulary,
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート: 先頭シート
    /// - 対象列: H
    /// - 参照列・開始行: 自動検出（検出できなければA列・4行目）
    /// - 照合モード: `Strict`
    /// - 隣接列の幅: 7
    pub fn new() -> Self {
        Self {
            sheet: SheetSelector::default(),
            target_columns: vec![DEFAULT_TARGET_COLUMN.to_string()],
            reference_column: None,
            start_row: None,
            match_mode: MatchMode::default(),
            adjacent_span: DEFAULT_ADJACENT_SPAN,
            vocabulary: ReferenceVocabulary::default(),
        }
    }

    /// 抽出対象のシートを選択する
    pub fn with_sheet(mut self, selector: SheetSelector) -> Self {
        self.sheet = selector;
        self
    }

    /// 画像が配置されている対象列を指定する
    ///
    /// # 引数
    ///
    /// * `columns`: 列名のリスト（例: `["H"]`）。空のリストは`build()`時にエラー
    pub fn with_target_columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.target_columns = columns
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        self
    }

    /// 参照列（REF列）を指定する。指定しない場合は自動検出
    pub fn with_reference_column(mut self, column: &str) -> Self {
        self.reference_column = Some(column.to_string());
        self
    }

    /// データ開始行（1始まり）を指定する。指定しない場合は自動検出
    ///
    /// # 制約
    ///
    /// * 1以上でなければならない。0は`build()`時に`XlsxPicError::Config`
    pub fn with_start_row(mut self, row: u32) -> Self {
        self.start_row = Some(row);
        self
    }

    /// 照合モードを指定する
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// 隣接セル戦略で参照列の右側に調べる列数を指定する（1以上）
    pub fn with_adjacent_span(mut self, span: u32) -> Self {
        self.adjacent_span = span;
        self
    }

    /// 除外リストと見出し語を差し替える
    pub fn with_vocabulary(mut self, vocabulary: ReferenceVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// 設定を検証し、`Extractor`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxPicError::Config(String)`: 設定の検証に失敗した場合
    ///   * 対象列が空、または不正な列名
    ///   * 参照列が不正な列名
    ///   * 開始行が0
    ///   * 隣接列の幅が0
    pub fn build(self) -> Result<Extractor, XlsxPicError> {
        // 1. 対象列の検証
        if self.target_columns.is_empty() {
            return Err(XlsxPicError::Config(
                "At least one target column is required".to_string(),
            ));
        }
        let mut target_columns = Vec::with_capacity(self.target_columns.len());
        for name in &self.target_columns {
            let index = parse_column(name, "target")?;
            if !target_columns.contains(&index) {
                target_columns.push(index);
            }
        }

        // 2. 参照列の検証
        let reference_column = self
            .reference_column
            .as_deref()
            .map(|name| parse_column(name, "reference"))
            .transpose()?;

        // 3. 開始行・隣接列の幅の検証
        if self.start_row == Some(0) {
            return Err(XlsxPicError::Config(
                "Start row is 1-based and must be at least 1".to_string(),
            ));
        }
        if self.adjacent_span == 0 {
            return Err(XlsxPicError::Config(
                "Adjacent span must be at least 1".to_string(),
            ));
        }

        Ok(Extractor {
            config: ExtractionConfig {
                sheet: self.sheet,
                target_columns,
                reference_column,
                start_row: self.start_row,
                match_mode: self.match_mode,
                adjacent_span: self.adjacent_span,
                vocabulary: self.vocabulary,
            },
        })
    }
}

fn parse_column(name: &str, role: &str) -> Result<u32, XlsxPicError> {
    column_index(name).ok_or_else(|| {
        XlsxPicError::Config(format!(
            "Invalid {} column '{}': expected letters A..XFD",
            role, name
        ))
    })
}

/// 画像抽出を実行する構造体
///
/// `ExtractorBuilder::build()`で生成します。設定は不変で、複数のワークブックに再利用できます。
#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    /// ワークブックを開き、行単位で結果を取り出せるセッションを返す
    ///
    /// 参照列の走査と画像の対応付けはこの時点で完了し、
    /// 画像のバイト列はイテレーション時に読み込まれます。
    pub fn open<R: Read>(&self, reader: R) -> Result<ExtractionSession, XlsxPicError> {
        ExtractionSession::open(reader, &self.config)
    }

    /// ワークブック全体を処理し、レポートを返す
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::fs::File;
    /// use xlsxpic::ExtractorBuilder;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let extractor = ExtractorBuilder::new().build()?;
    /// let report = extractor.extract(File::open("catalogo.xlsx")?)?;
    /// for image in report.images() {
    ///     println!("{} -> {} ({} bytes)", image.reference, image.remote_file_name(), image.bytes.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn extract<R: Read>(&self, reader: R) -> Result<ExtractionReport, XlsxPicError> {
        Ok(self.open(reader)?.finish())
    }

    /// ファイルパスを指定してワークブック全体を処理する
    pub fn extract_path<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionReport, XlsxPicError> {
        let file = File::open(path)?;
        self.extract(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let extractor = ExtractorBuilder::new().build().unwrap();
        assert_eq!(extractor.config.target_columns, vec![7]);
        assert_eq!(extractor.config.reference_column, None);
        assert_eq!(extractor.config.start_row, None);
        assert_eq!(extractor.config.match_mode, MatchMode::Strict);
        assert_eq!(extractor.config.adjacent_span, 7);
        assert_eq!(extractor.config.sheet, SheetSelector::Index(0));
    }

    #[test]
    fn test_builder_custom() {
        let extractor = ExtractorBuilder::new()
            .with_sheet(SheetSelector::Name("Produtos".to_string()))
            .with_target_columns(["h", "I", "H"])
            .with_reference_column("B")
            .with_start_row(2)
            .with_match_mode(MatchMode::Loose)
            .with_adjacent_span(3)
            .build()
            .unwrap();
        assert_eq!(extractor.config.target_columns, vec![7, 8]);
        assert_eq!(extractor.config.reference_column, Some(1));
        assert_eq!(extractor.config.start_row, Some(2));
        assert_eq!(extractor.config.adjacent_span, 3);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let empty: [&str; 0] = [];
        let cases = vec![
            ExtractorBuilder::new().with_target_columns(empty),
            ExtractorBuilder::new().with_target_columns(["H1"]),
            ExtractorBuilder::new().with_reference_column("?"),
            ExtractorBuilder::new().with_start_row(0),
            ExtractorBuilder::new().with_adjacent_span(0),
        ];
        for builder in cases {
            assert!(matches!(builder.build(), Err(XlsxPicError::Config(_))));
        }
    }
}
