//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//!
//! 座標系は2種類あります。描画パート（アンカー）は0始まりの行・列、
//! ワークシートの参照行（`ReferenceEntry::row`）は1始まりです。
//! 両者の比較は必ず [`AnchorRecord::sheet_row`] を経由します。

use serde::Serialize;

/// Excelの最大列インデックス（XFD、0始まり）
pub(crate) const MAX_COLUMN_INDEX: u32 = 16_383;

/// Excelの最大行インデックス（1048576行目、0始まり）
pub(crate) const MAX_ROW_INDEX: u32 = 1_048_575;

/// アンカーの形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnchorKind {
    /// `<xdr:oneCellAnchor>`: 左上セルのみ固定
    OneCell,
    /// `<xdr:twoCellAnchor>`: 左上・右下の2セルで固定
    TwoCell,
}

/// 描画パート内の画像配置1件
///
/// `column`と`row`は描画座標系（0始まり）です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRecord {
    pub kind: AnchorKind,
    pub column: u32,
    pub row: u32,
    pub embed_id: String,
}

impl AnchorRecord {
    /// ワークシートの行番号（1始まり）
    pub fn sheet_row(&self) -> u32 {
        self.row.saturating_add(1)
    }

    /// 列名（例: 7 -> "H"）
    pub fn column_letter(&self) -> String {
        column_letter(self.column)
    }
}

/// 参照列の有効な1行（1始まりの行番号とREF文字列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub row: u32,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// 画像バイト列をどの戦略で取得したか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImageSource {
    /// 対象列・同一行のアンカーから取得
    EmbeddedExact,
    /// 参照列に隣接する列・同一行のアンカーから取得（Looseモードのみ）
    EmbeddedAdjacent,
    /// 行順とメディア順の対応付けによる推定
    EmbeddedSequential,
    /// どの行にも対応付けられなかったメディア
    InternalUnassociated,
}

/// 抽出された画像1件
///
/// `reference`は同一パスで走査した`ReferenceEntry`のいずれかと必ず一致します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    #[serde(rename = "ref")]
    pub reference: String,
    pub row: u32,
    pub column_letter: String,
    /// パッケージ内のメディアパス（例: `xl/media/image1.png`）
    pub media_path: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub source: ImageSource,
}

impl ImageRecord {
    /// 転送先でのファイル名（`<sanitized ref>.jpg`）
    pub fn remote_file_name(&self) -> String {
        crate::transfer::remote_file_name(&self.reference, self.row)
    }
}

/// 列インデックスを列名に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
pub fn column_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = (col % 26) as u8;
        result.insert(0, (b'A' + remainder) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// 列名を列インデックスに変換（"A" -> 0, "AA" -> 26）
///
/// 英字以外を含む場合や、XFDを超える場合は`None`を返します。大文字・小文字は区別しません。
pub fn column_index(letters: &str) -> Option<u32> {
    let letters = letters.trim();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }

    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        index = index * 26 + digit;
    }

    let index = index - 1;
    if index > MAX_COLUMN_INDEX {
        return None;
    }
    Some(index)
}
