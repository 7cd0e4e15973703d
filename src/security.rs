//! Security Module
//!
//! パッケージを開く際に適用する制限（ZIP bomb、パストラバーサル）を提供するモジュール。

use crate::error::XlsxPicError;

/// パッケージのセキュリティ制限
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の合計最大サイズ（バイト）。デフォルト: 1GB
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大エントリ数。デフォルト: 10000
    pub max_entry_count: usize,
    /// 単一エントリの最大サイズ（バイト）。デフォルト: 100MB
    pub max_entry_size: u64,
    /// 入力ファイルの最大サイズ（バイト）。デフォルト: 2GB
    pub max_input_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824,
            max_entry_count: 10_000,
            max_entry_size: 104_857_600,
            max_input_size: 2_147_483_648,
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証する
    pub fn check_input_size(&self, size: u64) -> Result<(), XlsxPicError> {
        if size > self.max_input_size {
            return Err(XlsxPicError::SecurityViolation(format!(
                "Input size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_size
            )));
        }
        Ok(())
    }

    /// エントリ数を検証する
    pub fn check_entry_count(&self, count: usize) -> Result<(), XlsxPicError> {
        if count > self.max_entry_count {
            return Err(XlsxPicError::SecurityViolation(format!(
                "Package contains too many entries: {} (max: {})",
                count, self.max_entry_count
            )));
        }
        Ok(())
    }

    /// 1エントリのサイズを検証し、展開後サイズの累計に加算する
    pub fn account_entry(
        &self,
        name: &str,
        size: u64,
        running_total: &mut u64,
    ) -> Result<(), XlsxPicError> {
        if size > self.max_entry_size {
            return Err(XlsxPicError::SecurityViolation(format!(
                "Entry '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                name, size, self.max_entry_size
            )));
        }

        *running_total = running_total.checked_add(size).ok_or_else(|| {
            XlsxPicError::SecurityViolation("Decompressed size overflow".to_string())
        })?;

        if *running_total > self.max_decompressed_size {
            return Err(XlsxPicError::SecurityViolation(format!(
                "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                running_total, self.max_decompressed_size
            )));
        }
        Ok(())
    }
}

/// エントリ名の検証
///
/// 絶対パス、`..`を含むパス、バックスラッシュ区切りのパスを拒否します。
pub(crate) fn validate_entry_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Empty entry name".to_string());
    }

    let bytes = name.as_bytes();
    let has_drive_prefix = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if name.starts_with('/') || has_drive_prefix {
        return Err(format!("Absolute entry name: {}", name));
    }

    if name.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal in entry name: {}", name));
    }

    if name.contains('\\') {
        return Err(format!("Backslash in entry name: {}", name));
    }

    Ok(())
}
