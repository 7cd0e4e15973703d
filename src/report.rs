//! Report Module
//!
//! 抽出結果（行ごとの結果、メディア一覧、集計値）と、そのJSON要約を定義します。

use serde::Serialize;

use crate::error::XlsxPicError;
use crate::locator::Strategy;
use crate::scanner::{LayoutOrigin, ReferenceLayout};
use crate::types::{ImageRecord, ImageSource, ReferenceEntry};

/// 参照行1件の抽出結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// 画像のバイト列を取得できた
    Extracted(ImageRecord),
    /// 隣接セルに値があり画像ありと判定（バイト列なし）
    FlaggedAdjacent(ReferenceEntry),
    /// 画像が見つからない
    NoImage(ReferenceEntry),
    /// 画像の位置は特定できたが、バイト列を読めなかった
    ReadFailed {
        entry: ReferenceEntry,
        media_path: String,
        reason: String,
    },
}

impl RowOutcome {
    /// 結果に対応する参照行
    pub fn row(&self) -> u32 {
        match self {
            RowOutcome::Extracted(image) => image.row,
            RowOutcome::FlaggedAdjacent(entry)
            | RowOutcome::NoImage(entry)
            | RowOutcome::ReadFailed { entry, .. } => entry.row,
        }
    }

    /// 結果に対応するREF
    pub fn reference(&self) -> &str {
        match self {
            RowOutcome::Extracted(image) => &image.reference,
            RowOutcome::FlaggedAdjacent(entry)
            | RowOutcome::NoImage(entry)
            | RowOutcome::ReadFailed { entry, .. } => &entry.reference,
        }
    }

    pub fn image(&self) -> Option<&ImageRecord> {
        match self {
            RowOutcome::Extracted(image) => Some(image),
            _ => None,
        }
    }
}

/// パッケージ内のメディア1件の使用状況
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaUsage {
    pub media_path: String,
    /// 取得に使われた戦略。どの行にも使われなければ`InternalUnassociated`
    pub source: ImageSource,
    /// 最初に使用した行
    pub row: Option<u32>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// 1ワークブック分の抽出結果
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// 対象シート名
    pub sheet: String,
    pub layout: ReferenceLayout,
    /// 採用された戦略（どの戦略も対応付けを得られなければ`None`）
    pub strategy: Option<Strategy>,
    /// 参照行ごとの結果（文書順）
    pub outcomes: Vec<RowOutcome>,
    /// メディア一覧（パッケージ順）
    pub media: Vec<MediaUsage>,
}

impl ExtractionReport {
    /// 走査した参照行の数
    pub fn total_refs(&self) -> usize {
        self.outcomes.len()
    }

    /// 取得できた画像の数
    pub fn images_found(&self) -> usize {
        self.images().count()
    }

    /// 隣接セルの値で画像ありと判定した行の数
    pub fn flagged_rows(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::FlaggedAdjacent(_)))
    }

    /// 画像が見つからなかった行の数
    pub fn no_image_rows(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::NoImage(_)))
    }

    /// バイト列の読み込みに失敗した行の数
    pub fn failed_rows(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::ReadFailed { .. }))
    }

    fn count(&self, predicate: impl Fn(&RowOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    /// 取得できた画像（文書順）
    pub fn images(&self) -> impl Iterator<Item = &ImageRecord> {
        self.outcomes.iter().filter_map(RowOutcome::image)
    }

    /// 取得できた画像の所有権を取り出す
    pub fn into_images(self) -> Vec<ImageRecord> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                RowOutcome::Extracted(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    /// どの行にも対応付けられなかったメディア
    pub fn unassociated_media(&self) -> impl Iterator<Item = &MediaUsage> {
        self.media
            .iter()
            .filter(|m| m.source == ImageSource::InternalUnassociated)
    }

    /// シリアライズ可能な要約
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            sheet: self.sheet.clone(),
            reference_column: self.layout.column_letter(),
            header_row: self.layout.header_row,
            data_start_row: self.layout.data_start_row,
            layout_origin: self.layout.origin,
            strategy: self.strategy,
            total_refs: self.total_refs(),
            images_found: self.images_found(),
            flagged_rows: self.flagged_rows(),
            no_image_rows: self.no_image_rows(),
            failed_rows: self.failed_rows(),
            images: self
                .images()
                .map(|image| ImageSummary {
                    reference: image.reference.clone(),
                    row: image.row,
                    file_name: image.remote_file_name(),
                    media_path: image.media_path.clone(),
                    source: image.source,
                    size: image.bytes.len(),
                })
                .collect(),
            failures: self
                .outcomes
                .iter()
                .filter_map(|outcome| match outcome {
                    RowOutcome::ReadFailed {
                        entry,
                        media_path,
                        reason,
                    } => Some(FailureSummary {
                        reference: entry.reference.clone(),
                        row: entry.row,
                        media_path: media_path.clone(),
                        reason: reason.clone(),
                    }),
                    _ => None,
                })
                .collect(),
            unassociated_media: self
                .unassociated_media()
                .map(|m| m.media_path.clone())
                .collect(),
        }
    }

    /// 要約をJSON文字列に変換する
    pub fn to_json(&self) -> Result<String, XlsxPicError> {
        serde_json::to_string_pretty(&self.summary())
            .map_err(|e| XlsxPicError::Config(format!("JSON serialization error: {}", e)))
    }
}

/// `ExtractionReport`の要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub sheet: String,
    pub reference_column: String,
    pub header_row: Option<u32>,
    pub data_start_row: u32,
    pub layout_origin: LayoutOrigin,
    pub strategy: Option<Strategy>,
    pub total_refs: usize,
    pub images_found: usize,
    pub flagged_rows: usize,
    pub no_image_rows: usize,
    pub failed_rows: usize,
    pub images: Vec<ImageSummary>,
    pub failures: Vec<FailureSummary>,
    pub unassociated_media: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    #[serde(rename = "ref")]
    pub reference: String,
    pub row: u32,
    pub file_name: String,
    pub media_path: String,
    pub source: ImageSource,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    #[serde(rename = "ref")]
    pub reference: String,
    pub row: u32,
    pub media_path: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(row: u32, reference: &str) -> ReferenceEntry {
        ReferenceEntry {
            row,
            reference: reference.to_string(),
        }
    }

    fn sample_report() -> ExtractionReport {
        ExtractionReport {
            sheet: "Produtos".to_string(),
            layout: ReferenceLayout {
                column: 0,
                header_row: Some(3),
                data_start_row: 4,
                origin: LayoutOrigin::HeaderToken,
            },
            strategy: Some(Strategy::Anchor),
            outcomes: vec![
                RowOutcome::Extracted(ImageRecord {
                    reference: "SJ0001".to_string(),
                    row: 4,
                    column_letter: "H".to_string(),
                    media_path: "xl/media/image1.png".to_string(),
                    bytes: vec![0x89, 0x50, 0x4E, 0x47],
                    source: ImageSource::EmbeddedExact,
                }),
                RowOutcome::NoImage(entry(5, "SJ0002")),
                RowOutcome::ReadFailed {
                    entry: entry(6, "SJ0003"),
                    media_path: "xl/media/image9.png".to_string(),
                    reason: "zero-length entry".to_string(),
                },
                RowOutcome::FlaggedAdjacent(entry(7, "SJ0004")),
            ],
            media: vec![
                MediaUsage {
                    media_path: "xl/media/image1.png".to_string(),
                    source: ImageSource::EmbeddedExact,
                    row: Some(4),
                    reference: Some("SJ0001".to_string()),
                },
                MediaUsage {
                    media_path: "xl/media/image2.png".to_string(),
                    source: ImageSource::InternalUnassociated,
                    row: None,
                    reference: None,
                },
            ],
        }
    }

    #[test]
    fn test_counters() {
        let report = sample_report();
        assert_eq!(report.total_refs(), 4);
        assert_eq!(report.images_found(), 1);
        assert_eq!(report.no_image_rows(), 1);
        assert_eq!(report.failed_rows(), 1);
        assert_eq!(report.flagged_rows(), 1);
        assert_eq!(report.outcomes[3].reference(), "SJ0004");
        assert_eq!(report.outcomes[2].row(), 6);
    }

    #[test]
    fn test_summary_json() {
        let report = sample_report();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["reference_column"], "A");
        assert_eq!(json["layout_origin"], "HeaderToken");
        assert_eq!(json["strategy"], "Anchor");
        assert_eq!(json["images_found"], 1);
        assert_eq!(json["images"][0]["ref"], "SJ0001");
        assert_eq!(json["images"][0]["file_name"], "SJ0001.jpg");
        assert_eq!(json["images"][0]["size"], 4);
        assert_eq!(json["failures"][0]["reason"], "zero-length entry");
        assert_eq!(json["unassociated_media"][0], "xl/media/image2.png");
    }

    #[test]
    fn test_into_images() {
        let images = sample_report().into_images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].bytes.len(), 4);
    }
}
