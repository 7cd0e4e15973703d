//! Drawing Parser Module
//!
//! 描画パート（`xl/drawings/drawingN.xml`）からアンカーを抽出します。
//!
//! `<xdr:oneCellAnchor>` と `<xdr:twoCellAnchor>` を同じ形で扱い、
//! `<xdr:from>` の列・行と、サブツリー内で最初に見つかった `<a:blip r:embed>` を
//! 1件の [`AnchorRecord`] にまとめます。要素名は名前空間で判定するため、
//! プレフィックス（`xdr:`、`a:` 等）が異なるファイルでも同じ結果になります。

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::XlsxPicError;
use crate::types::{AnchorKind, AnchorRecord, MAX_COLUMN_INDEX, MAX_ROW_INDEX};

const NS_SPREADSHEET_DRAWING: &[u8] =
    b"http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const NS_DRAWING_MAIN: &[u8] = b"http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_RELATIONSHIPS: &[u8] =
    b"http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    SpreadsheetDrawing,
    DrawingMain,
    Relationships,
    Other,
}

fn classify(result: &ResolveResult) -> Ns {
    match result {
        ResolveResult::Bound(Namespace(ns)) if *ns == NS_SPREADSHEET_DRAWING => {
            Ns::SpreadsheetDrawing
        }
        ResolveResult::Bound(Namespace(ns)) if *ns == NS_DRAWING_MAIN => Ns::DrawingMain,
        ResolveResult::Bound(Namespace(ns)) if *ns == NS_RELATIONSHIPS => Ns::Relationships,
        _ => Ns::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coordinate {
    Column,
    Row,
}

/// 解析中のアンカー
#[derive(Debug)]
struct PendingAnchor {
    kind: AnchorKind,
    column: Option<u32>,
    row: Option<u32>,
    embed_id: Option<String>,
    malformed: bool,
}

impl PendingAnchor {
    fn new(kind: AnchorKind) -> Self {
        Self {
            kind,
            column: None,
            row: None,
            embed_id: None,
            malformed: false,
        }
    }

    fn finish(self) -> Option<AnchorRecord> {
        if self.malformed {
            return None;
        }
        Some(AnchorRecord {
            kind: self.kind,
            column: self.column?,
            row: self.row?,
            embed_id: self.embed_id?,
        })
    }
}

/// 描画パートを解析し、アンカーを文書順に返す
///
/// 位置（`from`）や埋め込みIDが取得できないアンカー（図形・テキストボックス等）は
/// エラーにせずスキップします。XML自体が不正な場合のみ`XlsxPicError::Xml`を返します。
///
/// 出力順は順序対応付け（sequential fallback）に影響するため、文書順を保持します。
pub fn parse_anchors(xml: &[u8]) -> Result<Vec<AnchorRecord>, XlsxPicError> {
    let mut reader = NsReader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut anchors = Vec::new();
    let mut pending: Option<PendingAnchor> = None;
    let mut in_from = false;
    let mut coordinate: Option<Coordinate> = None;
    let mut seen = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let (ns, local) = reader.resolve_element(e.name());
                let ns = classify(&ns);
                match (ns, local.as_ref()) {
                    (Ns::SpreadsheetDrawing, b"oneCellAnchor") => {
                        pending = Some(PendingAnchor::new(AnchorKind::OneCell));
                        in_from = false;
                    }
                    (Ns::SpreadsheetDrawing, b"twoCellAnchor") => {
                        pending = Some(PendingAnchor::new(AnchorKind::TwoCell));
                        in_from = false;
                    }
                    (Ns::SpreadsheetDrawing, b"from") if pending.is_some() => in_from = true,
                    (Ns::SpreadsheetDrawing, b"col") if in_from => {
                        coordinate = Some(Coordinate::Column)
                    }
                    (Ns::SpreadsheetDrawing, b"row") if in_from => {
                        coordinate = Some(Coordinate::Row)
                    }
                    (Ns::DrawingMain, b"blip") => {
                        if let Some(anchor) = pending.as_mut() {
                            read_embed_attribute(&reader, &e, anchor)?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let (ns, local) = reader.resolve_element(e.name());
                if classify(&ns) == Ns::DrawingMain && local.as_ref() == b"blip" {
                    if let Some(anchor) = pending.as_mut() {
                        read_embed_attribute(&reader, &e, anchor)?;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(field), Some(anchor)) = (coordinate, pending.as_mut()) {
                    let text = e.unescape()?;
                    match (field, text.trim().parse::<u32>()) {
                        (Coordinate::Column, Ok(value)) if value <= MAX_COLUMN_INDEX => {
                            anchor.column = Some(value)
                        }
                        (Coordinate::Row, Ok(value)) if value <= MAX_ROW_INDEX => {
                            anchor.row = Some(value)
                        }
                        // 数値でない、またはシートの範囲外
                        _ => anchor.malformed = true,
                    }
                }
            }
            Ok(Event::End(e)) => {
                let (ns, local) = reader.resolve_element(e.name());
                let ns = classify(&ns);
                match (ns, local.as_ref()) {
                    (Ns::SpreadsheetDrawing, b"oneCellAnchor")
                    | (Ns::SpreadsheetDrawing, b"twoCellAnchor") => {
                        if let Some(anchor) = pending.take() {
                            seen += 1;
                            match anchor.finish() {
                                Some(record) => anchors.push(record),
                                None => log::debug!(
                                    "skipping anchor #{}: no position or embedded picture",
                                    seen
                                ),
                            }
                        }
                        in_from = false;
                        coordinate = None;
                    }
                    (Ns::SpreadsheetDrawing, b"from") => in_from = false,
                    (Ns::SpreadsheetDrawing, b"col") | (Ns::SpreadsheetDrawing, b"row") => {
                        coordinate = None
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxPicError::Xml(format!("drawing: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(anchors)
}

/// `<a:blip>`の`r:embed`属性を読み取る（アンカー内で最初の1件のみ採用）
fn read_embed_attribute(
    reader: &NsReader<&[u8]>,
    element: &BytesStart<'_>,
    anchor: &mut PendingAnchor,
) -> Result<(), XlsxPicError> {
    if anchor.embed_id.is_some() {
        return Ok(());
    }

    for attr in element.attributes() {
        let attr = attr.map_err(|e| XlsxPicError::Xml(format!("attribute error: {}", e)))?;
        let (ns, local) = reader.resolve_attribute(attr.key);
        if classify(&ns) == Ns::Relationships && local.as_ref() == b"embed" {
            let value = attr.decode_and_unescape_value(reader)?;
            let value = value.trim();
            if !value.is_empty() {
                anchor.embed_id = Some(value.to_string());
            }
            break;
        }
    }
    Ok(())
}
