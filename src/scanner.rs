//! Reference Column Scanner Module
//!
//! 参照列（REF列）を開始行から最終行まで走査し、有効な`ReferenceEntry`を生成します。
//! 列・開始行が指定されていない場合は、ヘッダーの見出し語とコード形式の値から自動検出します。

use serde::Serialize;

use crate::api::ReferenceVocabulary;
use crate::parser::SheetGrid;
use crate::types::{column_letter, ReferenceEntry};

/// 自動検出が失敗したときの参照列（A）
pub(crate) const DEFAULT_REFERENCE_COLUMN: u32 = 0;

/// 自動検出が失敗したときのデータ開始行
pub(crate) const DEFAULT_START_ROW: u32 = 4;

/// ヘッダー行の探索順（慣例の3行目と1行目を優先）
const HEADER_SEARCH_ROWS: [u32; 5] = [3, 1, 2, 4, 5];

/// コード形式の値を探す行数
const PATTERN_SEARCH_ROWS: u32 = 20;

/// 見出し語を探す最大列数（A..Z）
const HEADER_SEARCH_COLUMNS: u32 = 26;

/// 参照列の配置をどのように決定したか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutOrigin {
    /// 列・開始行ともに設定値
    Configured,
    /// ヘッダーの見出し語から検出
    HeaderToken,
    /// 連続するコード形式の値から検出
    CodePattern,
    /// 検出できず既定値を使用
    Default,
}

/// 参照列の配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceLayout {
    /// 参照列（0始まり）
    pub column: u32,
    /// ヘッダー行（1始まり）
    pub header_row: Option<u32>,
    /// データ開始行（1始まり）
    pub data_start_row: u32,
    pub origin: LayoutOrigin,
}

impl ReferenceLayout {
    /// 参照列の列名
    pub fn column_letter(&self) -> String {
        column_letter(self.column)
    }
}

/// 参照列の配置を決定する
///
/// 列・開始行の両方が指定されていればそのまま使います。それ以外は
/// 1. 見出し語（`REF`, `CÓDIGO`など）を3, 1, 2, 4, 5行目の順に探す
/// 2. 同じ列に2行続くコード形式の値（英字と数字の混在）を探す
/// 3. 既定値（A列、4行目）
///
/// の順に決定し、指定された側の値は常に優先します。
pub(crate) fn detect_layout(
    grid: &SheetGrid,
    column: Option<u32>,
    start_row: Option<u32>,
    vocabulary: &ReferenceVocabulary,
) -> ReferenceLayout {
    if let (Some(column), Some(start_row)) = (column, start_row) {
        return ReferenceLayout {
            column,
            header_row: start_row.checked_sub(1).filter(|r| *r > 0),
            data_start_row: start_row,
            origin: LayoutOrigin::Configured,
        };
    }

    if let Some((col, header_row)) = find_header(grid, column, vocabulary) {
        let layout = ReferenceLayout {
            column: col,
            header_row: Some(header_row),
            data_start_row: start_row.unwrap_or(header_row + 1),
            origin: LayoutOrigin::HeaderToken,
        };
        log::info!(
            "reference header found at {}{}; data starts at row {}",
            layout.column_letter(),
            header_row,
            layout.data_start_row
        );
        return layout;
    }

    if let Some((col, first_row)) = find_code_pattern(grid, column, vocabulary) {
        let layout = ReferenceLayout {
            column: col,
            header_row: first_row.checked_sub(1).filter(|r| *r > 0),
            data_start_row: start_row.unwrap_or(first_row),
            origin: LayoutOrigin::CodePattern,
        };
        log::info!(
            "reference codes detected in column {} from row {}",
            layout.column_letter(),
            layout.data_start_row
        );
        return layout;
    }

    let layout = ReferenceLayout {
        column: column.unwrap_or(DEFAULT_REFERENCE_COLUMN),
        header_row: None,
        data_start_row: start_row.unwrap_or(DEFAULT_START_ROW),
        origin: LayoutOrigin::Default,
    };
    log::info!(
        "no reference header detected; using column {} from row {}",
        layout.column_letter(),
        layout.data_start_row
    );
    layout
}

fn candidate_columns(grid: &SheetGrid, fixed: Option<u32>, limit: u32) -> Vec<u32> {
    match fixed {
        Some(col) => vec![col],
        None => match grid.last_column() {
            Some(last) => (0..=last.min(limit.saturating_sub(1))).collect(),
            None => Vec::new(),
        },
    }
}

fn find_header(
    grid: &SheetGrid,
    column: Option<u32>,
    vocabulary: &ReferenceVocabulary,
) -> Option<(u32, u32)> {
    let columns = candidate_columns(grid, column, HEADER_SEARCH_COLUMNS);
    HEADER_SEARCH_ROWS.iter().find_map(|&row| {
        columns.iter().find_map(|&col| {
            grid.text(row, col)
                .filter(|value| vocabulary.is_header_token(value))
                .map(|_| (col, row))
        })
    })
}

fn find_code_pattern(
    grid: &SheetGrid,
    column: Option<u32>,
    vocabulary: &ReferenceVocabulary,
) -> Option<(u32, u32)> {
    let columns = candidate_columns(grid, column, u32::MAX);
    let is_code = |row: u32, col: u32| {
        grid.text(row, col)
            .map(|value| looks_like_code(&value) && !vocabulary.is_denied(&value))
            .unwrap_or(false)
    };

    (1..=PATTERN_SEARCH_ROWS).find_map(|row| {
        columns
            .iter()
            .find(|&&col| is_code(row, col) && is_code(row + 1, col))
            .map(|&col| (col, row))
    })
}

/// 商品コードらしい値か（例: `SJ0001`, `AB-12`）
fn looks_like_code(value: &str) -> bool {
    let value = value.trim();
    let len = value.chars().count();
    (2..=40).contains(&len)
        && value.chars().any(|c| c.is_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

/// 参照列の遅延走査
///
/// 空セル・除外リストの値はスキップし、前後の空白を除いた値を返します。
/// 走査のたびに[`scan`]で新しいイテレータを作ります。
pub(crate) struct ReferenceScan<'a> {
    grid: &'a SheetGrid,
    vocabulary: &'a ReferenceVocabulary,
    column: u32,
    next_row: u32,
    last_row: u32,
}

impl Iterator for ReferenceScan<'_> {
    type Item = ReferenceEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_row <= self.last_row {
            let row = self.next_row;
            self.next_row += 1;

            let Some(value) = self.grid.text(row, self.column) else {
                continue;
            };
            if self.vocabulary.is_denied(&value) {
                log::debug!("row {}: skipping label '{}'", row, value.trim());
                continue;
            }
            return Some(ReferenceEntry {
                row,
                reference: value.trim().to_string(),
            });
        }
        None
    }
}

/// `start_row`（1始まり）から最終行まで参照列を走査する
pub(crate) fn scan<'a>(
    grid: &'a SheetGrid,
    column: u32,
    start_row: u32,
    vocabulary: &'a ReferenceVocabulary,
) -> ReferenceScan<'a> {
    ReferenceScan {
        grid,
        vocabulary,
        column,
        next_row: start_row.max(1),
        last_row: grid.last_row(),
    }
}
