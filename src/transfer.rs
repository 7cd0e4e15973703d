//! Transfer Module
//!
//! 抽出した画像を転送先へ受け渡すための境界です。
//! 転送先ファイル名の導出、`ImageSink`トレイト、ローカルディレクトリへの保存を提供します。
//! FTP/SFTPなどのリモート転送は、このトレイトを実装する呼び出し側の責務です。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::XlsxPicError;
use crate::report::ExtractionReport;

/// 転送先ファイルの拡張子（元画像の形式に関係なく固定）
const REMOTE_EXTENSION: &str = "jpg";

/// REFから転送先のファイル名を導出する
///
/// 英数字・`-`・`_`以外を除去し、`.jpg`を付けます。
/// 除去後に空になった場合は`image_<YYYYmmdd_HHMMSS>_<row>.jpg`を使います。
///
/// ```rust
/// use xlsxpic::remote_file_name;
///
/// assert_eq!(remote_file_name("SJ 0001/A", 4), "SJ0001A.jpg");
/// assert!(remote_file_name("???", 7).starts_with("image_"));
/// ```
pub fn remote_file_name(reference: &str, row: u32) -> String {
    let sanitized: String = reference
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if sanitized.is_empty() {
        format!(
            "image_{}_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            row,
            REMOTE_EXTENSION
        )
    } else {
        format!("{}.{}", sanitized, REMOTE_EXTENSION)
    }
}

/// 画像の転送先
///
/// 1件ごとに成功・失敗を返します。再試行やリモートディレクトリの作成は実装側の責務です。
pub trait ImageSink {
    fn store(&mut self, remote_name: &str, payload: &[u8]) -> Result<(), XlsxPicError>;
}

/// ローカルディレクトリへ保存する`ImageSink`
///
/// ディレクトリは最初の保存時に作成します。同名ファイルは上書きされます。
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    created: bool,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            created: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageSink for DirectorySink {
    fn store(&mut self, remote_name: &str, payload: &[u8]) -> Result<(), XlsxPicError> {
        let transfer_error = |e: std::io::Error| XlsxPicError::Transfer {
            name: remote_name.to_string(),
            message: e.to_string(),
        };

        if !self.created {
            fs::create_dir_all(&self.root).map_err(transfer_error)?;
            self.created = true;
        }

        fs::write(self.root.join(remote_name), payload).map_err(transfer_error)
    }
}

/// 転送結果の集計
#[derive(Debug, Default)]
pub struct DeliveryStats {
    pub successful: usize,
    pub failed: usize,
    pub bytes_sent: u64,
    pub errors: Vec<XlsxPicError>,
}

/// 抽出した画像をすべて転送先へ渡す
///
/// 1件の失敗で残りの転送は中断しません。
pub fn deliver<S: ImageSink + ?Sized>(report: &ExtractionReport, sink: &mut S) -> DeliveryStats {
    let mut stats = DeliveryStats::default();

    for image in report.images() {
        let name = image.remote_file_name();
        match sink.store(&name, &image.bytes) {
            Ok(()) => {
                stats.successful += 1;
                stats.bytes_sent += image.bytes.len() as u64;
                log::debug!("stored {} ({} bytes)", name, image.bytes.len());
            }
            Err(e) => {
                log::warn!("failed to store {}: {}", name, e);
                stats.failed += 1;
                stats.errors.push(e);
            }
        }
    }

    log::info!(
        "delivered {} images ({} bytes), {} failed",
        stats.successful,
        stats.bytes_sent,
        stats.failed
    );
    stats
}
