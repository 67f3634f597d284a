//! HMAC-SHA256 본문 서명.
//!
//! 서명은 압축 전 JSON 본문에 대해 계산하며 소문자 hex로 전송한다.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use telemon_core::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

/// 공유 서명 키
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self(key.as_ref().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, CoreError> {
        HmacSha256::new_from_slice(&self.0)
            .map_err(|e| CoreError::Internal(format!("HMAC 초기화 실패: {e}")))
    }

    /// 본문 서명 (소문자 hex)
    pub fn sign(&self, body: &[u8]) -> Result<String, CoreError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 서명 검증. 비교는 상수 시간으로 수행한다.
    pub fn verify(&self, body: &[u8], signature: &str) -> Result<(), CoreError> {
        let expected = hex::decode(signature.trim()).map_err(|_| CoreError::SignatureMismatch)?;
        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| CoreError::SignatureMismatch)
    }
}

// 키 자체는 로그에 남기지 않는다
impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(***)")
    }
}
