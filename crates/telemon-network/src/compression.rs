//! gzip 압축/해제.

use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::Read;
use telemon_core::error::CoreError;

/// 기본 압축 레벨로 gzip 압축
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut encoder = GzEncoder::new(data, Compression::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| CoreError::Internal(format!("gzip 압축 실패: {e}")))?;
    Ok(compressed)
}

/// gzip 해제. 손상된 입력은 잘못된 요청으로 취급한다.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CoreError::InvalidMetric(format!("gzip 해제 실패: {e}")))?;
    Ok(decompressed)
}
