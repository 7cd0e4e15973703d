//! Relationship Parser Module
//!
//! `*.rels` パート（`http://schemas.openxmlformats.org/package/2006/relationships`）を解析します。
//! 描画パートの埋め込みID → メディアファイル名の対応表と、
//! ワークブック・ワークシートのパート解決に使う汎用リストを提供します。

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::XlsxPicError;

/// リレーションシップ1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// 埋め込みID -> メディアファイル名（ベース名）の対応表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipMap {
    images: HashMap<String, String>,
}

impl RelationshipMap {
    /// 埋め込みIDに対応するメディアファイル名（例: `image1.png`）
    pub fn file_name(&self, embed_id: &str) -> Option<&str> {
        self.images.get(embed_id).map(|s| s.as_str())
    }

    /// 埋め込みIDに対応するパッケージ内のパス（例: `xl/media/image1.png`）
    pub fn media_path(&self, embed_id: &str) -> Option<String> {
        self.file_name(embed_id)
            .map(|name| format!("xl/media/{}", name))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// 画像リレーションシップのみを抽出して対応表を構築する
///
/// `Type`属性に（大文字・小文字を区別せず）`image`を含むものだけを記録し、
/// ターゲットはベース名に変換します。空のパートは空の対応表になります。
/// XML自体が不正な場合のみエラーを返します。
pub fn parse_relationships(xml: &[u8]) -> Result<RelationshipMap, XlsxPicError> {
    let mut map = RelationshipMap::default();

    for rel in parse_relationship_list(xml)? {
        if !rel.rel_type.to_ascii_lowercase().contains("image") {
            log::debug!("skipping relationship {} of type {}", rel.id, rel.rel_type);
            continue;
        }
        let file_name = rel
            .target
            .rsplit('/')
            .next()
            .unwrap_or(rel.target.as_str())
            .to_string();
        if file_name.is_empty() {
            continue;
        }
        // 重複IDは先勝ち
        map.images.entry(rel.id).or_insert(file_name);
    }

    Ok(map)
}

/// すべてのリレーションシップを文書順に列挙する
pub(crate) fn parse_relationship_list(xml: &[u8]) -> Result<Vec<Relationship>, XlsxPicError> {
    let mut relationships = Vec::new();
    if xml.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(relationships);
    }

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = None;
                    let mut rel_type = None;
                    let mut target = None;

                    for attr in e.attributes() {
                        let attr = attr
                            .map_err(|e| XlsxPicError::Xml(format!("attribute error: {}", e)))?;
                        let value = attr.decode_and_unescape_value(&reader)?.into_owned();
                        match attr.key.local_name().as_ref() {
                            b"Id" => id = Some(value),
                            b"Type" => rel_type = Some(value),
                            b"Target" => target = Some(value),
                            _ => {}
                        }
                    }

                    // Id/Targetが欠落したリレーションシップはスキップ
                    if let (Some(id), Some(target)) = (id, target) {
                        relationships.push(Relationship {
                            id,
                            rel_type: rel_type.unwrap_or_default(),
                            target,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxPicError::Xml(format!("relationships: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// リレーションシップのターゲットをパッケージ内の絶対パスに解決する
///
/// `source_part`はリレーションシップの所有パート（例: `xl/worksheets/sheet1.xml`）です。
///
/// - `../drawings/drawing1.xml` -> `xl/drawings/drawing1.xml`
/// - `/xl/media/image1.png` -> `xl/media/image1.png`
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    // 所有パートのファイル名を除く
    segments.pop();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// パートに対応する`.rels`パートのパス（例: `xl/drawings/drawing1.xml` -> `xl/drawings/_rels/drawing1.xml.rels`）
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
