//! テストフィクスチャ生成
//!
//! `rust_xlsxwriter`でワークブックを生成し、必要に応じて`zip`で
//! 描画パート・メディア・リレーションシップを差し込みます。
#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use rust_xlsxwriter::{Image, Workbook, XlsxError};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// 1シート分の内容（行・列は0始まり）
pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub cells: &'a [(u32, u16, &'a str)],
    /// (行, 列, 画像のシード値)
    pub images: &'a [(u32, u16, u8)],
}

/// 1x1ピクセルPNGの共通部分（シグネチャ、IHDR、IDATの長さ・種別・zlibヘッダー）
const PNG_HEAD: &str = "89504e470d0a1a0a0000000d4948445200000001000000010802000000907753de0000000c4944415478da";

/// IDATの残り（deflateデータ、Adler-32、CRC）。シード値0..=9の画素色ごと
const PNG_BODIES: [&str; 10] = [
    "63606068000000840081f7883d3e",
    "6360646e0000008d008518aef968",
    "6360626b000000960089953cdff2",
    "6360e66c0000009f008d8f5695ca",
    "6360e169000000a80091e28e1c2e",
    "6360e56f000000b10095118e7b08",
    "6360136a000000ba00997f51eaa8",
    "6360176d000000c3009d62f14d1a",
    "63e09068000000cc00a12b51d58b",
    "63e0946e000000d500a5d851b2ad",
];

const PNG_IEND: &str = "0000000049454e44ae426082";

/// 1x1ピクセルのPNG。シード値（0..=9、以降は循環）ごとに異なるバイト列になる
pub fn png(seed: u8) -> Vec<u8> {
    let hex = format!(
        "{}{}{}",
        PNG_HEAD,
        PNG_BODIES[seed as usize % PNG_BODIES.len()],
        PNG_IEND
    );
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

/// JPEGらしいダミーのバイト列（内容は検証されない）
pub fn jpeg(seed: u8) -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, seed, seed, 0xFF, 0xD9]
}

/// 複数シートのワークブックを生成する
pub fn workbook(sheets: &[SheetSpec<'_>]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    for spec in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(spec.name)?;
        for &(row, col, value) in spec.cells {
            worksheet.write_string(row, col, value)?;
        }
        for &(row, col, seed) in spec.images {
            let image = Image::new_from_buffer(&png(seed))?;
            worksheet.insert_image(row, col, &image)?;
        }
    }

    workbook.save_to_buffer()
}

/// 3行目（A3）に"REF"の見出し、4行目からREFを並べたカタログ
///
/// `images`は(行, 列, シード値)で、行・列は0始まり。
pub fn catalog(refs: &[&str], images: &[(u32, u16, u8)]) -> Result<Vec<u8>, XlsxError> {
    let mut cells = vec![(0u32, 0u16, "Catálogo de produtos"), (2, 0, "REF"), (2, 1, "Descrição")];
    for (i, reference) in refs.iter().enumerate() {
        cells.push((3 + i as u32, 0, *reference));
    }
    workbook(&[SheetSpec {
        name: "Produtos",
        cells: &cells,
        images,
    }])
}

/// パッケージを再構成する: `remove`のエントリを除き、`add`のエントリを追加（同名は置換）
pub fn repack(xlsx: &[u8], remove: &[&str], add: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(xlsx)).unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let name = entry.name().to_string();
        if remove.contains(&name.as_str()) || add.iter().any(|(n, _)| *n == name) {
            continue;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        writer.start_file(name, FileOptions::default()).unwrap();
        writer.write_all(&content).unwrap();
    }

    for (name, content) in add {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// 描画パートのXML。`anchors`は(oneCellか, 列, 行, 埋め込みID)で、座標は0始まり
pub fn drawing_xml(anchors: &[(bool, u32, u32, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for &(one_cell, col, row, embed) in anchors {
        let (open, close, extent) = if one_cell {
            ("xdr:oneCellAnchor", "xdr:oneCellAnchor", r#"<xdr:ext cx="952500" cy="952500"/>"#.to_string())
        } else {
            (
                r#"xdr:twoCellAnchor editAs="oneCell""#,
                "xdr:twoCellAnchor",
                format!(
                    "<xdr:to><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>",
                    col + 1,
                    row + 1
                ),
            )
        };
        body.push_str(&format!(
            r#"<{open}><xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>{extent}<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Picture"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="{embed}"/></xdr:blipFill><xdr:spPr/></xdr:pic><xdr:clientData/></{close}>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}</xdr:wsDr>"#,
        body
    )
    .into_bytes()
}

/// 画像リレーションシップパートのXML。`targets`は(ID, ターゲット)
pub fn image_rels(targets: &[(&str, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (id, target) in targets {
        body.push_str(&format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{}"/>"#,
            id, target
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        body
    )
    .into_bytes()
}

/// `xl/worksheets/sheet1.xml`から`xl/drawings/drawing1.xml`への描画リレーションシップ
pub fn sheet_drawing_rels() -> (&'static str, Vec<u8>) {
    (
        "xl/worksheets/_rels/sheet1.xml.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#
            .to_vec(),
    )
}
