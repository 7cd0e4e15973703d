//! Worksheet Module
//!
//! calamineでワークシートのセル値を読み込み、参照列の走査に必要な
//! 最小限のアクセス（1始まりの行番号でのテキスト取得、最終行）を提供します。
//! あわせて、`xl/workbook.xml` のシート一覧（名前とリレーションシップID）を解析します。

use calamine::{Data, Range, Reader, Xlsx};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::io::{Read, Seek};

use crate::api::SheetSelector;
use crate::error::XlsxPicError;

/// 1シート分のセル値
#[derive(Debug, Clone)]
pub(crate) struct SheetGrid {
    /// シート名
    pub name: String,
    /// ワークブック内のインデックス（0始まり）
    pub index: usize,
    range: Range<Data>,
}

impl SheetGrid {
    /// ワークブックを開き、選択されたシートのセル値を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxPicError::Parse)` - ワークブック・シートを解析できない場合（シートが1つもない場合を含む）
    /// * `Err(XlsxPicError::Config)` - 選択したシートが存在しない場合
    pub fn load<RS: Read + Seek>(reader: RS, selector: &SheetSelector) -> Result<Self, XlsxPicError> {
        let mut workbook: Xlsx<RS> =
            Xlsx::new(reader).map_err(|e| XlsxPicError::Parse(e.into()))?;
        let sheet_names = workbook.sheet_names();
        // `xl/workbook.xml`が欠落・破損していると、calamineはシートなしで開く
        if sheet_names.is_empty() {
            return Err(XlsxPicError::Parse(calamine::Error::Msg(
                "workbook declares no worksheets",
            )));
        }

        let (index, name) = match selector {
            SheetSelector::Index(index) => {
                let name = sheet_names.get(*index).ok_or_else(|| {
                    XlsxPicError::Config(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        sheet_names.len()
                    ))
                })?;
                (*index, name.clone())
            }
            SheetSelector::Name(name) => {
                let index = sheet_names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| XlsxPicError::Config(format!("Sheet '{}' not found", name)))?;
                (index, name.clone())
            }
        };

        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| XlsxPicError::Parse(e.into()))?;

        Ok(Self { name, index, range })
    }

    /// セルのテキスト表現（行は1始まり、列は0始まり）
    ///
    /// 空セル・範囲外は`None`。数値の整数値は小数点なしで表現します（`1234.0` -> `"1234"`）。
    pub fn text(&self, row: u32, col: u32) -> Option<String> {
        if row == 0 {
            return None;
        }
        let value = self.range.get_value((row - 1, col))?;
        let text = match value {
            Data::Empty => return None,
            Data::String(s) => s.clone(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Data::Bool(b) => b.to_string(),
            other => other.to_string(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// 値を持つ最終行（1始まり）。空のシートは0
    pub fn last_row(&self) -> u32 {
        self.range.end().map(|(row, _)| row + 1).unwrap_or(0)
    }

    /// 値を持つ最終列（0始まり）。空のシートは`None`
    pub fn last_column(&self) -> Option<u32> {
        self.range.end().map(|(_, col)| col)
    }

    /// 行ごとの文字列からグリッドを構築する（先頭行が1行目）
    #[cfg(test)]
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = if height == 0 || width == 0 {
            Range::empty()
        } else {
            Range::new((0, 0), (height - 1, width - 1))
        };
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        Self {
            name: "Sheet1".to_string(),
            index: 0,
            range,
        }
    }
}

/// `xl/workbook.xml`の`<sheet>`要素
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkbookSheet {
    pub name: String,
    pub rel_id: String,
}

/// `xl/workbook.xml`からシート名とリレーションシップIDを文書順に取得する
pub(crate) fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<WorkbookSheet>, XlsxPicError> {
    let mut reader = XmlReader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = None;
                    let mut rel_id = None;
                    for attr in e.attributes() {
                        let attr = attr
                            .map_err(|e| XlsxPicError::Xml(format!("attribute error: {}", e)))?;
                        match attr.key.local_name().as_ref() {
                            b"name" => {
                                name = Some(attr.decode_and_unescape_value(&reader)?.into_owned())
                            }
                            // r:id（プレフィックス付き）
                            b"id" if attr.key.prefix().is_some() => {
                                rel_id = Some(attr.decode_and_unescape_value(&reader)?.into_owned())
                            }
                            _ => {}
                        }
                    }
                    if let (Some(name), Some(rel_id)) = (name, rel_id) {
                        sheets.push(WorkbookSheet { name, rel_id });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxPicError::Xml(format!("workbook: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}
