//! Parser Module
//!
//! パッケージ内の各パート（描画、リレーションシップ、ワークブック）の解析と、
//! calamineを使用したワークシートのセル値読み込み。

mod drawing;
mod relationships;
mod worksheet;

pub use drawing::parse_anchors;
pub use relationships::{parse_relationships, RelationshipMap};

pub(crate) use relationships::{parse_relationship_list, rels_path_for, resolve_target};
pub(crate) use worksheet::{parse_workbook_sheets, SheetGrid};
