//! Extraction Engine Module
//!
//! 参照行ごとに画像を決定し、バイト列を読み込んで`RowOutcome`を生成します。
//!
//! 1回の抽出は `Opened -> Scanning -> Locating -> Extracting -> Closed` の順に進みます。
//! `Closed`はセッションのドロップ時に必ず1回だけ到達し、パッケージもそこで解放されます。
//! 画像のバイト列は行を取り出したときに初めて読み込むため、途中でイテレーションを
//! やめればそれ以降の読み込みは発生しません。

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::builder::ExtractionConfig;
use crate::error::XlsxPicError;
use crate::locator::{self, AnchoredImage, Association, LocatorInput, Strategy};
use crate::package::WorkbookPackage;
use crate::parser::SheetGrid;
use crate::report::{ExtractionReport, MediaUsage, RowOutcome};
use crate::scanner::{self, ReferenceLayout};
use crate::security::SecurityConfig;
use crate::types::{column_letter, ImageRecord, ImageSource, ReferenceEntry};

/// 抽出処理の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opened,
    Scanning,
    Locating,
    Extracting,
    Closed,
}

/// 段階の遷移を記録し、ドロップ時に`Closed`へ遷移する
#[derive(Debug)]
struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    fn open() -> Self {
        log::debug!("extraction phase: {:?}", Phase::Opened);
        Self {
            phase: Phase::Opened,
        }
    }

    fn advance(&mut self, next: Phase) {
        if self.phase != next {
            log::debug!("extraction phase: {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        log::debug!("extraction phase: {:?} -> {:?}", self.phase, Phase::Closed);
        self.phase = Phase::Closed;
    }
}

type PackageReader = Cursor<Arc<[u8]>>;

/// 1ワークブックに対する抽出セッション
///
/// `Iterator`として参照行ごとの`RowOutcome`を文書順に返します。
pub struct ExtractionSession {
    package: WorkbookPackage<PackageReader>,
    sheet: String,
    layout: ReferenceLayout,
    strategy: Option<Strategy>,
    association: Option<Association>,
    references: std::vec::IntoIter<ReferenceEntry>,
    /// 順序対応付けで使う列名（先頭の対象列）
    fallback_column: String,
    media: Vec<String>,
    /// メディアパス -> 最初に使用した行
    consumed: HashMap<String, (ImageSource, ReferenceEntry)>,
    // 最後にドロップされるよう末尾に置く
    lifecycle: Lifecycle,
}

impl ExtractionSession {
    /// 入力を読み込み、参照列の走査と画像の対応付けまでを行う
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxPicError::NotAPackage)` - 入力がZIPコンテナではない
    /// * `Err(XlsxPicError::Parse)` - ワークシートを解析できない
    /// * `Err(XlsxPicError::Config)` - 選択したシートが存在しない
    pub(crate) fn open<R: Read>(mut reader: R, config: &ExtractionConfig) -> Result<Self, XlsxPicError> {
        let mut lifecycle = Lifecycle::open();

        let security = SecurityConfig::default();
        let mut buffer = Vec::new();
        reader
            .by_ref()
            .take(security.max_input_size + 1)
            .read_to_end(&mut buffer)?;
        security.check_input_size(buffer.len() as u64)?;
        let data: Arc<[u8]> = buffer.into();

        let mut package = WorkbookPackage::from_reader(Cursor::new(Arc::clone(&data)))?;
        let grid = SheetGrid::load(Cursor::new(data), &config.sheet)?;

        lifecycle.advance(Phase::Scanning);
        let layout = scanner::detect_layout(
            &grid,
            config.reference_column,
            config.start_row,
            &config.vocabulary,
        );
        let references: Vec<ReferenceEntry> =
            scanner::scan(&grid, layout.column, layout.data_start_row, &config.vocabulary)
                .collect();
        log::info!(
            "sheet '{}': {} reference rows in column {} from row {}",
            grid.name,
            references.len(),
            layout.column_letter(),
            layout.data_start_row
        );

        lifecycle.advance(Phase::Locating);
        let drawing = locator::load_drawing(&mut package, &grid.name, grid.index);
        let media = package.media_entries();
        let pool = locator::sequential_pool(&mut package, drawing.path.as_deref(), &media);
        let located = locator::locate(&LocatorInput {
            anchors: &drawing.anchors,
            relationships: &drawing.relationships,
            media: &pool,
            grid: &grid,
            references: &references,
            layout: &layout,
            target_columns: &config.target_columns,
            adjacent_span: config.adjacent_span,
            mode: config.match_mode,
        });
        let (strategy, association) = match located {
            Some((strategy, association)) => (Some(strategy), Some(association)),
            None => (None, None),
        };

        let fallback_column = config
            .target_columns
            .first()
            .map(|&col| column_letter(col))
            .unwrap_or_default();

        Ok(Self {
            package,
            sheet: grid.name,
            layout,
            strategy,
            association,
            references: references.into_iter(),
            fallback_column,
            media,
            consumed: HashMap::new(),
            lifecycle,
        })
    }

    /// 現在の段階
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase
    }

    pub fn layout(&self) -> &ReferenceLayout {
        &self.layout
    }

    /// 採用された戦略
    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// 残りの行をすべて処理し、レポートを生成する
    pub fn finish(mut self) -> ExtractionReport {
        let outcomes: Vec<RowOutcome> = self.by_ref().collect();

        let media = self
            .media
            .iter()
            .map(|path| match self.consumed.get(path) {
                Some((source, entry)) => MediaUsage {
                    media_path: path.clone(),
                    source: *source,
                    row: Some(entry.row),
                    reference: Some(entry.reference.clone()),
                },
                None => MediaUsage {
                    media_path: path.clone(),
                    source: ImageSource::InternalUnassociated,
                    row: None,
                    reference: None,
                },
            })
            .collect();

        let report = ExtractionReport {
            sheet: std::mem::take(&mut self.sheet),
            layout: self.layout.clone(),
            strategy: self.strategy,
            outcomes,
            media,
        };
        log::info!(
            "extracted {} of {} rows ({} without image, {} failed)",
            report.images_found(),
            report.total_refs(),
            report.no_image_rows(),
            report.failed_rows()
        );
        report
    }

    fn resolve_row(&mut self, entry: ReferenceEntry) -> RowOutcome {
        match &mut self.association {
            Some(Association::Anchored(rows)) => match rows.get(&entry.row) {
                Some(AnchoredImage {
                    media_path,
                    column_letter,
                    adjacent,
                }) => {
                    let source = if *adjacent {
                        ImageSource::EmbeddedAdjacent
                    } else {
                        ImageSource::EmbeddedExact
                    };
                    let (media_path, column_letter) = (media_path.clone(), column_letter.clone());
                    self.fetch(entry, media_path, column_letter, source)
                }
                None => RowOutcome::NoImage(entry),
            },
            Some(Association::Adjacent(rows)) if rows.contains(&entry.row) => {
                RowOutcome::FlaggedAdjacent(entry)
            }
            Some(Association::Sequential(queue)) => match queue.pop_front() {
                Some(media_path) => {
                    let column_letter = self.fallback_column.clone();
                    self.fetch(entry, media_path, column_letter, ImageSource::EmbeddedSequential)
                }
                None => RowOutcome::NoImage(entry),
            },
            _ => RowOutcome::NoImage(entry),
        }
    }

    /// 画像のバイト列を読み込む。失敗はその行だけの結果として扱う
    fn fetch(
        &mut self,
        entry: ReferenceEntry,
        media_path: String,
        column_letter: String,
        source: ImageSource,
    ) -> RowOutcome {
        let reason = match self.package.read(&media_path) {
            Ok(bytes) if !bytes.is_empty() => {
                self.consumed
                    .entry(media_path.clone())
                    .or_insert_with(|| (source, entry.clone()));
                return RowOutcome::Extracted(ImageRecord {
                    reference: entry.reference,
                    row: entry.row,
                    column_letter,
                    media_path,
                    bytes,
                    source,
                });
            }
            Ok(_) => "zero-length entry".to_string(),
            Err(e) => e.to_string(),
        };

        log::warn!(
            "row {} ({}): cannot read {}: {}",
            entry.row,
            entry.reference,
            media_path,
            reason
        );
        RowOutcome::ReadFailed {
            entry,
            media_path,
            reason,
        }
    }
}

impl Iterator for ExtractionSession {
    type Item = RowOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.references.next()?;
        self.lifecycle.advance(Phase::Extracting);
        Some(self.resolve_row(entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.references.size_hint()
    }
}
