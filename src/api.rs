//! Public API Types
//!
//! 公開APIで使用する設定用の型を定義するモジュール。

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 抽出対象シートの選択方式
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// インデックス指定（0始まり）。デフォルトは先頭シート
    Index(usize),

    /// シート名指定
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

/// 画像と行の対応付けの厳密さ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum MatchMode {
    /// アンカー → 順序対応付け の順に試行する（デフォルト）
    ///
    /// 対象列に配置された画像だけを行に対応付けます。
    #[default]
    Strict,

    /// アンカー → 隣接セル → 順序対応付け の順に試行する
    ///
    /// 「REFに画像があるか」を確認する緩い判定向けです。参照列の右側の
    /// 隣接列に配置された画像も受け入れ（`ImageSource::EmbeddedAdjacent`）、
    /// アンカーが一切ない場合は隣接セルに値があるかどうかで画像の有無を判定します。
    /// 後者の場合、画像のバイト列は生成しません。
    Loose,
}

/// 参照列の解釈に使う語彙
///
/// 集計行のラベル（除外リスト）とヘッダーの見出し語を設定データとして保持します。
/// 比較は前後の空白を除き、大文字化し、アクセント記号を除去して行います
/// （例: `"Código"` と `"CODIGO"` は一致）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceVocabulary {
    denylist: Vec<String>,
    header_tokens: Vec<String>,
}

impl Default for ReferenceVocabulary {
    fn default() -> Self {
        Self::new(
            ["TOTAL", "SUBTOTAL", "SUM", "COUNT", "REF", ""],
            ["REF", "REFERENCIA", "REFERENCE", "CODIGO", "COD", "CODE", "SKU"],
        )
    }
}

impl ReferenceVocabulary {
    /// 除外リストと見出し語から語彙を生成する
    ///
    /// ```rust
    /// use xlsxpic::ReferenceVocabulary;
    ///
    /// let vocabulary = ReferenceVocabulary::new(["TOTAL", "GESAMT"], ["ARTIKEL"]);
    /// assert!(vocabulary.is_denied("gesamt"));
    /// assert!(vocabulary.is_header_token("Artikel"));
    /// ```
    pub fn new<D, H>(denylist: D, header_tokens: H) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        H: IntoIterator,
        H::Item: AsRef<str>,
    {
        Self {
            denylist: denylist
                .into_iter()
                .map(|s| fold_label(s.as_ref()))
                .collect(),
            header_tokens: header_tokens
                .into_iter()
                .map(|s| fold_label(s.as_ref()))
                .collect(),
        }
    }

    /// 除外リストに一致するか（空文字列を含む）
    pub fn is_denied(&self, value: &str) -> bool {
        let folded = fold_label(value);
        folded.is_empty() || self.denylist.iter().any(|d| *d == folded)
    }

    /// ヘッダーの見出し語に一致するか
    pub fn is_header_token(&self, value: &str) -> bool {
        let folded = fold_label(value);
        !folded.is_empty() && self.header_tokens.iter().any(|t| *t == folded)
    }
}

/// 比較用に正規化する（空白除去・アクセント除去・大文字化・末尾の`.`/`:`除去）
pub(crate) fn fold_label(value: &str) -> String {
    let folded: String = value
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_uppercase())
        .collect();
    folded
        .trim_end_matches(|c: char| c == '.' || c == ':')
        .trim()
        .to_string()
}
