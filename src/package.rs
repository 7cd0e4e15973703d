//! Package Reader Module
//!
//! XLSXファイル（ZIPアーカイブ）をOOXMLパッケージとして開き、
//! エントリの一覧取得と名前指定での全量読み込みを提供します。
//!
//! パッケージは読み取り専用で、アーカイブのハンドルは`WorkbookPackage`の
//! 生存期間中だけ保持されます（ドロップで解放）。

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::XlsxPicError;
use crate::parser::{parse_relationship_list, parse_workbook_sheets, rels_path_for, resolve_target};
use crate::security::{validate_entry_name, SecurityConfig};

/// 画像として扱うメディアの拡張子
const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// 開かれたOOXMLパッケージ
pub struct WorkbookPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
    /// エントリ名（セントラルディレクトリ順）
    entries: Vec<String>,
    security: SecurityConfig,
}

impl WorkbookPackage<File> {
    /// ファイルパスからパッケージを開く
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxPicError::Io)` - ファイルを開けない場合
    /// * `Err(XlsxPicError::NotAPackage)` - ZIPコンテナとして不正な場合
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, XlsxPicError> {
        let file = File::open(path)?;
        let security = SecurityConfig::default();
        security.check_input_size(file.metadata()?.len())?;
        Self::from_reader(file)
    }
}

impl WorkbookPackage<Cursor<Vec<u8>>> {
    /// メモリ上のバイト列からパッケージを開く
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, XlsxPicError> {
        SecurityConfig::default().check_input_size(bytes.len() as u64)?;
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> WorkbookPackage<R> {
    /// 任意のリーダーからパッケージを開き、全エントリにセキュリティ検証を適用する
    pub fn from_reader(reader: R) -> Result<Self, XlsxPicError> {
        let security = SecurityConfig::default();

        let mut archive = ZipArchive::new(reader).map_err(|e| match e {
            ZipError::Io(io) => XlsxPicError::NotAPackage(io.to_string()),
            other => XlsxPicError::NotAPackage(other.to_string()),
        })?;

        security.check_entry_count(archive.len())?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut total_size = 0u64;
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let name = entry.name().to_string();

            validate_entry_name(&name).map_err(|e| {
                XlsxPicError::SecurityViolation(format!("Invalid entry name: {}", e))
            })?;
            security.account_entry(&name, entry.size(), &mut total_size)?;

            entries.push(name);
        }

        Ok(Self {
            archive,
            entries,
            security,
        })
    }

    /// エントリの内容を全量読み込む
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxPicError::EntryNotFound)` - エントリが存在しない場合
    pub fn read(&mut self, path: &str) -> Result<Vec<u8>, XlsxPicError> {
        let entry = self.archive.by_name(path).map_err(|e| match e {
            ZipError::FileNotFound => XlsxPicError::EntryNotFound(path.to_string()),
            other => XlsxPicError::from(other),
        })?;

        // 宣言サイズを偽装したエントリに備えて、読み込み量にも上限を設ける
        let limit = self.security.max_entry_size;
        let mut content = Vec::new();
        entry.take(limit + 1).read_to_end(&mut content)?;
        if content.len() as u64 > limit {
            return Err(XlsxPicError::SecurityViolation(format!(
                "Entry '{}' exceeds maximum size: {} bytes",
                path, limit
            )));
        }

        Ok(content)
    }

    /// エントリを読み込む。存在しない場合は`Ok(None)`
    pub(crate) fn read_optional(&mut self, path: &str) -> Result<Option<Vec<u8>>, XlsxPicError> {
        match self.read(path) {
            Ok(content) => Ok(Some(content)),
            Err(XlsxPicError::EntryNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// エントリが存在するか
    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e == path)
    }

    /// 指定プレフィックスで始まるエントリ名（パッケージ順）
    pub fn list_entries(&self, prefix: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| name.as_str())
            .collect()
    }

    /// `xl/media/`配下の画像エントリ（パッケージ順）
    pub fn media_entries(&self) -> Vec<String> {
        self.list_entries("xl/media/")
            .into_iter()
            .filter(|name| is_media_file(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// `xl/drawings/`配下の描画パート（パッケージ順、リレーションシップパートを除く）
    pub(crate) fn drawing_parts(&self) -> Vec<String> {
        self.list_entries("xl/drawings/")
            .into_iter()
            .filter(|name| name.ends_with(".xml") && !name.contains("/_rels/"))
            .map(|name| name.to_string())
            .collect()
    }

    /// シートのワークシートパートを`xl/workbook.xml`とそのリレーションシップから解決する
    pub(crate) fn worksheet_part(&mut self, sheet_name: &str) -> Option<String> {
        let workbook = self.read_optional(WORKBOOK_PART).ok().flatten()?;
        let sheets = parse_workbook_sheets(&workbook).ok()?;
        let sheet = sheets.into_iter().find(|s| s.name == sheet_name)?;

        let rels = self
            .read_optional(&rels_path_for(WORKBOOK_PART))
            .ok()
            .flatten()?;
        let relationship = parse_relationship_list(&rels)
            .ok()?
            .into_iter()
            .find(|r| r.id == sheet.rel_id)?;

        Some(resolve_target(WORKBOOK_PART, &relationship.target))
    }

    /// シートの描画パートを解決する
    ///
    /// ワークシートパートが解決できればその`.rels`の`drawing`リレーションシップに従い
    /// （`.rels`がなければ描画なし）、解決できない場合のみ
    /// `xl/drawings/drawing{index+1}.xml`を仮定します。
    pub(crate) fn drawing_part(&mut self, sheet_name: &str, sheet_index: usize) -> Option<String> {
        if let Some(worksheet) = self.worksheet_part(sheet_name) {
            let rels_path = rels_path_for(&worksheet);
            let rels = self.read_optional(&rels_path).ok().flatten()?;
            let list = match parse_relationship_list(&rels) {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("ignoring unparsable relationships {}: {}", rels_path, e);
                    return None;
                }
            };
            return list
                .into_iter()
                .find(|r| r.rel_type.ends_with("/drawing"))
                .map(|r| resolve_target(&worksheet, &r.target))
                .filter(|path| self.contains(path));
        }

        let fallback = format!("xl/drawings/drawing{}.xml", sheet_index + 1);
        if self.contains(&fallback) {
            log::debug!("assuming drawing part {} for sheet '{}'", fallback, sheet_name);
            Some(fallback)
        } else {
            None
        }
    }
}

fn is_media_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            MEDIA_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_not_a_package() {
        let result = WorkbookPackage::from_bytes(b"definitely not a zip file".to_vec());
        assert!(matches!(result, Err(XlsxPicError::NotAPackage(_))));
    }

    #[test]
    fn test_read_and_missing_entry() {
        let bytes = build_zip(&[("xl/media/image1.png", b"\x89PNG....")]);
        let mut package = WorkbookPackage::from_bytes(bytes).unwrap();

        assert_eq!(package.read("xl/media/image1.png").unwrap(), b"\x89PNG....");
        assert!(matches!(
            package.read("xl/media/image2.png"),
            Err(XlsxPicError::EntryNotFound(path)) if path == "xl/media/image2.png"
        ));
        assert_eq!(package.read_optional("xl/drawings/drawing1.xml").unwrap(), None);
    }

    #[test]
    fn test_media_entries_keep_package_order() {
        let bytes = build_zip(&[
            ("xl/media/image3.jpeg", b"3"),
            ("xl/workbook.xml", b"<workbook/>"),
            ("xl/media/image1.PNG", b"1"),
            ("xl/media/audio1.wav", b"w"),
            ("xl/media/image2.jpg", b"2"),
        ]);
        let package = WorkbookPackage::from_bytes(bytes).unwrap();

        assert_eq!(
            package.media_entries(),
            vec!["xl/media/image3.jpeg", "xl/media/image1.PNG", "xl/media/image2.jpg"]
        );
        assert_eq!(package.list_entries("xl/").len(), 5);
        assert!(package.contains("xl/workbook.xml"));
    }

    #[test]
    fn test_drawing_parts_skip_relationship_parts() {
        let bytes = build_zip(&[
            ("xl/drawings/drawing2.xml", b"<wsDr/>"),
            ("xl/drawings/_rels/drawing2.xml.rels", b"<Relationships/>"),
            ("xl/drawings/vmlDrawing1.vml", b"<xml/>"),
            ("xl/drawings/drawing1.xml", b"<wsDr/>"),
        ]);
        let package = WorkbookPackage::from_bytes(bytes).unwrap();

        assert_eq!(
            package.drawing_parts(),
            vec!["xl/drawings/drawing2.xml", "xl/drawings/drawing1.xml"]
        );
    }

    #[test]
    fn test_rejects_traversal_entry() {
        let bytes = build_zip(&[("../evil.png", b"x")]);
        assert!(matches!(
            WorkbookPackage::from_bytes(bytes),
            Err(XlsxPicError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_drawing_part_follows_worksheet_relationships() {
        let workbook = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Produtos" sheetId="1" r:id="rId7"/></sheets></workbook>"#;
        let workbook_rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let sheet_rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing3.xml"/></Relationships>"#;
        let bytes = build_zip(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", workbook_rels),
            ("xl/worksheets/sheet1.xml", b"<worksheet/>"),
            ("xl/worksheets/_rels/sheet1.xml.rels", sheet_rels),
            ("xl/drawings/drawing1.xml", b"<wsDr/>"),
            ("xl/drawings/drawing3.xml", b"<wsDr/>"),
        ]);
        let mut package = WorkbookPackage::from_bytes(bytes).unwrap();

        assert_eq!(
            package.worksheet_part("Produtos").as_deref(),
            Some("xl/worksheets/sheet1.xml")
        );
        assert_eq!(
            package.drawing_part("Produtos", 0).as_deref(),
            Some("xl/drawings/drawing3.xml")
        );
    }

    #[test]
    fn test_resolved_sheet_without_rels_has_no_drawing() {
        let workbook = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Resumo" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let workbook_rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let bytes = build_zip(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", workbook_rels),
            ("xl/worksheets/sheet1.xml", b"<worksheet/>"),
            ("xl/drawings/drawing1.xml", b"<wsDr/>"),
        ]);
        let mut package = WorkbookPackage::from_bytes(bytes).unwrap();

        assert_eq!(package.drawing_part("Resumo", 0), None);
    }

    #[test]
    fn test_drawing_part_fallback_by_index() {
        let bytes = build_zip(&[("xl/drawings/drawing2.xml", b"<wsDr/>")]);
        let mut package = WorkbookPackage::from_bytes(bytes).unwrap();

        assert_eq!(
            package.drawing_part("Sheet2", 1).as_deref(),
            Some("xl/drawings/drawing2.xml")
        );
        assert_eq!(package.drawing_part("Sheet1", 0), None);
    }
}
