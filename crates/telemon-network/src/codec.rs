//! 전송 코덱.
//!
//! 송신: 직렬화 → (키가 있으면) 압축 전 본문 서명 → gzip.
//! 수신: gzip 해제 → (검증 모드면) 서명 확인 → 역직렬화.
//! 서명이 압축 전 본문 기준이므로 수신 측은 반드시 먼저 해제해야 한다.

use serde::de::DeserializeOwned;
use serde::Serialize;
use telemon_core::error::CoreError;

use crate::compression;
use crate::signing::SigningKey;

/// 본문 서명 헤더
pub const SIGNATURE_HEADER: &str = "HashSHA256";

/// gzip 인코딩 토큰
pub const GZIP: &str = "gzip";

/// 본문 인코딩
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
}

impl ContentEncoding {
    /// `Content-Encoding` 헤더 값 해석
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.split(',').any(|token| token.trim() == GZIP) => ContentEncoding::Gzip,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            ContentEncoding::Identity => None,
            ContentEncoding::Gzip => Some(GZIP),
        }
    }
}

/// 전송 단위
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// 전송 본문 (인코딩 적용 후)
    pub body: Vec<u8>,
    pub content_encoding: ContentEncoding,
    /// 압축 전 본문의 HMAC-SHA256 (hex)
    pub signature: Option<String>,
}

/// 서명 + 압축 코덱
#[derive(Debug, Clone, Default)]
pub struct TransportCodec {
    key: Option<SigningKey>,
}

impl TransportCodec {
    pub fn new(key: Option<SigningKey>) -> Self {
        Self { key }
    }

    /// 비어 있지 않은 키 문자열에서 생성
    pub fn from_key(key: Option<&str>) -> Self {
        Self::new(key.filter(|k| !k.is_empty()).map(SigningKey::new))
    }

    /// 수신 시 서명을 강제하는지 여부
    pub fn enforces_signature(&self) -> bool {
        self.key.is_some()
    }

    /// 원본 본문 서명. 키가 없으면 `None`
    pub fn sign(&self, raw: &[u8]) -> Result<Option<String>, CoreError> {
        self.key.as_ref().map(|key| key.sign(raw)).transpose()
    }

    /// 값을 전송 단위로 인코딩
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Envelope, CoreError> {
        let json = serde_json::to_vec(value)?;
        self.encode_bytes(&json)
    }

    /// 이미 직렬화된 본문을 인코딩
    pub fn encode_bytes(&self, json: &[u8]) -> Result<Envelope, CoreError> {
        let signature = self.sign(json)?;
        Ok(Envelope {
            body: compression::gzip(json)?,
            content_encoding: ContentEncoding::Gzip,
            signature,
        })
    }

    /// 수신 본문 해제 + 서명 검증. 반환값은 원본 JSON 바이트.
    pub fn decode(
        &self,
        body: &[u8],
        encoding: ContentEncoding,
        signature: Option<&str>,
    ) -> Result<Vec<u8>, CoreError> {
        let raw = match encoding {
            ContentEncoding::Gzip => compression::gunzip(body)?,
            ContentEncoding::Identity => body.to_vec(),
        };

        if let Some(key) = &self.key {
            let signature = signature.ok_or(CoreError::SignatureMismatch)?;
            key.verify(&raw, signature)?;
        }

        Ok(raw)
    }

    /// 해제 + 검증 + 역직렬화
    pub fn decode_json<T: DeserializeOwned>(
        &self,
        body: &[u8],
        encoding: ContentEncoding,
        signature: Option<&str>,
    ) -> Result<T, CoreError> {
        let raw = self.decode(body, encoding, signature)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
