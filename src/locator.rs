//! Image Locator Module
//!
//! 行番号と画像の対応付けを、順序付きの戦略リストで決定します。
//! 戦略は先頭から順に実行され、最初に空でない結果を返した戦略で確定します
//! （行ごとのフォールバックではなく、全体としての段階的な切り替え）。
//!
//! | モード | 戦略の順序 |
//! |---|---|
//! | `Strict` | アンカー → 順序対応付け |
//! | `Loose` | アンカー → 隣接セル → 順序対応付け |

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{Read, Seek};

use serde::Serialize;

use crate::api::MatchMode;
use crate::package::WorkbookPackage;
use crate::parser::{parse_anchors, parse_relationships, rels_path_for, RelationshipMap, SheetGrid};
use crate::scanner::ReferenceLayout;
use crate::types::{AnchorRecord, ReferenceEntry};

/// 対応付けに採用された戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// 描画パートのアンカー位置
    Anchor,
    /// 参照列右側の隣接セルの値（画像のバイト列は伴わない）
    AdjacentCell,
    /// 行順とメディア順の対応付け
    Sequential,
}

/// アンカーで行に対応付けられた画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnchoredImage {
    pub media_path: String,
    pub column_letter: String,
    /// 対象列ではなく参照列の隣接列に配置されていた
    pub adjacent: bool,
}

/// 戦略が返す対応付け
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Association {
    /// ワークシート行（1始まり） -> 画像
    Anchored(BTreeMap<u32, AnchoredImage>),
    /// 隣接セルに値がある行
    Adjacent(BTreeSet<u32>),
    /// 未使用のメディア（パッケージ順）
    Sequential(VecDeque<String>),
}

/// 戦略の入力
pub(crate) struct LocatorInput<'a> {
    pub anchors: &'a [AnchorRecord],
    pub relationships: &'a RelationshipMap,
    pub media: &'a [String],
    pub grid: &'a SheetGrid,
    pub references: &'a [ReferenceEntry],
    pub layout: &'a ReferenceLayout,
    /// 対象列（0始まり）
    pub target_columns: &'a [u32],
    pub adjacent_span: u32,
    pub mode: MatchMode,
}

impl LocatorInput<'_> {
    fn is_adjacent_column(&self, column: u32) -> bool {
        let first = self.layout.column + 1;
        let last = self.layout.column.saturating_add(self.adjacent_span);
        (first..=last).contains(&column)
    }
}

type StrategyFn = fn(&LocatorInput<'_>) -> Option<Association>;

const STRICT_CHAIN: &[(Strategy, StrategyFn)] = &[
    (Strategy::Anchor, anchor_strategy),
    (Strategy::Sequential, sequential_strategy),
];

const LOOSE_CHAIN: &[(Strategy, StrategyFn)] = &[
    (Strategy::Anchor, anchor_strategy),
    (Strategy::AdjacentCell, adjacent_cell_strategy),
    (Strategy::Sequential, sequential_strategy),
];

/// モードに対応する戦略リスト
pub(crate) fn strategy_chain(mode: MatchMode) -> &'static [(Strategy, StrategyFn)] {
    match mode {
        MatchMode::Strict => STRICT_CHAIN,
        MatchMode::Loose => LOOSE_CHAIN,
    }
}

/// 戦略リストを順に実行し、最初に得られた対応付けを返す
pub(crate) fn locate(input: &LocatorInput<'_>) -> Option<(Strategy, Association)> {
    for (strategy, run) in strategy_chain(input.mode) {
        if let Some(association) = run(input) {
            log::info!("image association resolved by {:?} strategy", strategy);
            return Some((*strategy, association));
        }
        log::debug!("{:?} strategy produced no association", strategy);
    }
    log::info!("no image association could be established");
    None
}

/// 対象列（Looseモードでは隣接列も）かつ開始行以降のアンカーを行に対応付ける
///
/// 同じ行に複数のアンカーがある場合は文書順で先のものを採用します。
fn anchor_strategy(input: &LocatorInput<'_>) -> Option<Association> {
    let mut rows = BTreeMap::new();

    for anchor in input.anchors {
        let row = anchor.sheet_row();
        if row < input.layout.data_start_row {
            continue;
        }

        let adjacent = if input.target_columns.contains(&anchor.column) {
            false
        } else if input.mode == MatchMode::Loose && input.is_adjacent_column(anchor.column) {
            true
        } else {
            continue;
        };

        let Some(media_path) = input.relationships.media_path(&anchor.embed_id) else {
            log::debug!(
                "anchor at {}{} references unknown relationship {}",
                anchor.column_letter(),
                row,
                anchor.embed_id
            );
            continue;
        };

        rows.entry(row).or_insert(AnchoredImage {
            media_path,
            column_letter: anchor.column_letter(),
            adjacent,
        });
    }

    (!rows.is_empty()).then_some(Association::Anchored(rows))
}

/// 参照行のうち、参照列の右側`adjacent_span`列に値を持つ行
fn adjacent_cell_strategy(input: &LocatorInput<'_>) -> Option<Association> {
    let first = input.layout.column + 1;
    let last = input.layout.column.saturating_add(input.adjacent_span);

    let rows: BTreeSet<u32> = input
        .references
        .iter()
        .filter(|entry| (first..=last).any(|col| input.grid.text(entry.row, col).is_some()))
        .map(|entry| entry.row)
        .collect();

    (!rows.is_empty()).then_some(Association::Adjacent(rows))
}

/// メディアをパッケージ順に参照行へ割り当てる
///
/// 画像の挿入順と行順が一致するという仮定に基づく推定です。
/// アンカーが1件でもメディアに解決できた場合（対象範囲外に配置されていた場合を含む）は
/// 位置情報が存在するとみなし、この推定は行いません。
fn sequential_strategy(input: &LocatorInput<'_>) -> Option<Association> {
    if input.media.is_empty() {
        return None;
    }

    let resolvable = input
        .anchors
        .iter()
        .filter(|a| input.relationships.media_path(&a.embed_id).is_some())
        .count();
    if resolvable > 0 {
        log::info!(
            "{} anchored images lie outside the target area; sequential pairing skipped",
            resolvable
        );
        return None;
    }

    log::info!(
        "pairing {} media entries with reference rows in package order (approximation)",
        input.media.len()
    );
    Some(Association::Sequential(input.media.iter().cloned().collect()))
}

/// シートの描画パートの内容
#[derive(Debug, Default)]
pub(crate) struct SheetDrawing {
    /// 描画パートのパス（描画がなければ`None`）
    pub path: Option<String>,
    pub anchors: Vec<AnchorRecord>,
    pub relationships: RelationshipMap,
}

/// シートの描画パートからアンカーと画像リレーションシップを読み込む
///
/// 描画パート・リレーションシップパートの欠落や不正は致命的ではなく、
/// その場合は空のアンカー・空の対応表として扱います。
pub(crate) fn load_drawing<R: Read + Seek>(
    package: &mut WorkbookPackage<R>,
    sheet_name: &str,
    sheet_index: usize,
) -> SheetDrawing {
    let Some(drawing_path) = package.drawing_part(sheet_name, sheet_index) else {
        log::debug!("sheet '{}' has no drawing part", sheet_name);
        return SheetDrawing::default();
    };

    let (anchors, relationships) = read_drawing(package, &drawing_path);
    log::debug!(
        "{}: {} anchors, {} image relationships",
        drawing_path,
        anchors.len(),
        relationships.len()
    );
    SheetDrawing {
        path: Some(drawing_path),
        anchors,
        relationships,
    }
}

/// 順序対応付けに使えるメディア
///
/// 他のシートの描画パートでアンカーから参照されているメディアは、
/// そのシートの画像であるため除外します。
pub(crate) fn sequential_pool<R: Read + Seek>(
    package: &mut WorkbookPackage<R>,
    own_drawing: Option<&str>,
    media: &[String],
) -> Vec<String> {
    let mut claimed = BTreeSet::new();
    for path in package.drawing_parts() {
        if Some(path.as_str()) == own_drawing {
            continue;
        }
        let (anchors, relationships) = read_drawing(package, &path);
        claimed.extend(
            anchors
                .iter()
                .filter_map(|anchor| relationships.media_path(&anchor.embed_id)),
        );
    }

    let pool: Vec<String> = media
        .iter()
        .filter(|path| !claimed.contains(*path))
        .cloned()
        .collect();
    if pool.len() < media.len() {
        log::info!(
            "{} media entries belong to other drawings and are not paired sequentially",
            media.len() - pool.len()
        );
    }
    pool
}

fn read_drawing<R: Read + Seek>(
    package: &mut WorkbookPackage<R>,
    drawing_path: &str,
) -> (Vec<AnchorRecord>, RelationshipMap) {
    let anchors = match package.read(drawing_path) {
        Ok(xml) => parse_anchors(&xml).unwrap_or_else(|e| {
            log::warn!("ignoring unparsable drawing {}: {}", drawing_path, e);
            Vec::new()
        }),
        Err(e) => {
            log::warn!("cannot read drawing {}: {}", drawing_path, e);
            Vec::new()
        }
    };

    let rels_path = rels_path_for(drawing_path);
    let relationships = match package.read_optional(&rels_path) {
        Ok(Some(xml)) => parse_relationships(&xml).unwrap_or_else(|e| {
            log::warn!("ignoring unparsable relationships {}: {}", rels_path, e);
            RelationshipMap::default()
        }),
        Ok(None) => RelationshipMap::default(),
        Err(e) => {
            log::warn!("cannot read relationships {}: {}", rels_path, e);
            RelationshipMap::default()
        }
    };

    (anchors, relationships)
}
