/// Asset key derivation
///
/// Keys are either 256 bits of OS randomness in URL-safe base64, or the
/// owning video's id. Both carry the canonical extension of a validated
/// media type, so no client-supplied string ever reaches a path or object key.
use crate::error::{TubelyError, TubelyResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Number of random bytes in a random-mode key
const RANDOM_KEY_BYTES: usize = 32;

/// Media types accepted anywhere in the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaType {
    Png,
    Jpeg,
    Mp4,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Png, MediaType::Jpeg, MediaType::Mp4];

    /// Parse a declared Content-Type against the allow-list.
    ///
    /// Parameters (`; charset=...`) are ignored and matching is case-insensitive.
    pub fn parse(declared: &str) -> TubelyResult<Self> {
        let essence = declared
            .split(';')
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase();

        let well_formed = essence
            .split_once('/')
            .map(|(top, sub)| !top.is_empty() && !sub.is_empty() && !sub.contains('/'))
            .unwrap_or(false);
        if !well_formed {
            return Err(TubelyError::MalformedRequest(format!(
                "Unparsable content type '{}'",
                declared
            )));
        }

        MediaType::ALL
            .into_iter()
            .find(|media_type| media_type.as_str() == essence)
            .ok_or(TubelyError::UnsupportedMediaType(essence))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Mp4 => "video/mp4",
        }
    }

    /// Canonical file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Png => "png",
            MediaType::Jpeg => "jpg",
            MediaType::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which reference field of a video an upload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Thumbnail,
    Video,
}

impl AssetKind {
    /// Multipart field carrying the file
    pub fn field_name(&self) -> &'static str {
        match self {
            AssetKind::Thumbnail => "thumbnail",
            AssetKind::Video => "video",
        }
    }

    pub fn accepts(&self, media_type: MediaType) -> bool {
        match self {
            AssetKind::Thumbnail => matches!(media_type, MediaType::Png | MediaType::Jpeg),
            AssetKind::Video => matches!(media_type, MediaType::Mp4),
        }
    }

    /// Validate a declared content type for this kind of asset
    pub fn validate(&self, declared: &str) -> TubelyResult<MediaType> {
        let media_type = MediaType::parse(declared)?;
        if !self.accepts(media_type) {
            return Err(TubelyError::WrongContentForPurpose {
                purpose: self.field_name().to_string(),
                media_type: media_type.to_string(),
            });
        }
        Ok(media_type)
    }
}

/// Storage key for one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    /// Derive a key: from the owner hint when given, otherwise random
    pub fn derive(media_type: MediaType, owner_hint: Option<Uuid>) -> TubelyResult<Self> {
        match owner_hint {
            Some(owner) => Ok(Self::for_owner(owner, media_type)),
            None => Self::random(media_type),
        }
    }

    pub fn random(media_type: MediaType) -> TubelyResult<Self> {
        let mut buf = [0u8; RANDOM_KEY_BYTES];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| TubelyError::Internal(format!("Random source unavailable: {}", e)))?;

        let id = URL_SAFE_NO_PAD.encode(buf);
        Ok(Self(format!("{}.{}", id, media_type.extension())))
    }

    pub fn for_owner(owner: Uuid, media_type: MediaType) -> Self {
        Self(format!("{}.{}", owner.hyphenated(), media_type.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a string is usable as a single path segment / object key
    pub fn is_safe(key: &str) -> bool {
        !key.is_empty()
            && !key.starts_with('.')
            && !key.contains("..")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_extension_matches_type() {
        for media_type in MediaType::ALL {
            let key = AssetKey::random(media_type).unwrap();
            let ext = key.as_str().rsplit('.').next().unwrap();
            assert_eq!(ext, media_type.extension());

            let key = AssetKey::for_owner(Uuid::new_v4(), media_type);
            assert!(key.as_str().ends_with(&format!(".{}", media_type.extension())));
        }
    }

    #[test]
    fn test_unsupported_types_rejected() {
        for declared in ["application/pdf", "image/gif", "video/quicktime", "text/plain"] {
            assert!(matches!(
                MediaType::parse(declared),
                Err(TubelyError::UnsupportedMediaType(_))
            ));
        }
    }

    #[test]
    fn test_malformed_types_rejected() {
        for declared in ["", "png", "image/", "/png", "image/png/extra"] {
            assert!(matches!(
                MediaType::parse(declared),
                Err(TubelyError::MalformedRequest(_))
            ));
        }
    }

    #[test]
    fn test_parse_ignores_parameters_and_case() {
        assert_eq!(MediaType::parse("IMAGE/PNG").unwrap(), MediaType::Png);
        assert_eq!(
            MediaType::parse("image/jpeg; charset=binary").unwrap(),
            MediaType::Jpeg
        );
    }

    #[test]
    fn test_random_keys_unique() {
        let mut keys = HashSet::new();
        for _ in 0..10_000 {
            keys.insert(AssetKey::random(MediaType::Png).unwrap());
        }
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_random_key_is_url_and_path_safe() {
        let key = AssetKey::random(MediaType::Mp4).unwrap();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(key.as_str().len(), 43 + ".mp4".len());
        assert!(!key.as_str().contains('='));
        assert!(AssetKey::is_safe(key.as_str()));
    }

    #[test]
    fn test_owner_keys_are_stable() {
        let owner = Uuid::new_v4();
        let first = AssetKey::derive(MediaType::Jpeg, Some(owner)).unwrap();
        let second = AssetKey::derive(MediaType::Jpeg, Some(owner)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), format!("{}.jpg", owner));
    }

    #[test]
    fn test_kind_validation() {
        assert_eq!(
            AssetKind::Thumbnail.validate("image/png").unwrap(),
            MediaType::Png
        );
        assert!(matches!(
            AssetKind::Video.validate("image/png"),
            Err(TubelyError::WrongContentForPurpose { .. })
        ));
        assert!(matches!(
            AssetKind::Thumbnail.validate("application/pdf"),
            Err(TubelyError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_is_safe() {
        assert!(AssetKey::is_safe("abc-DEF_123.png"));
        assert!(!AssetKey::is_safe("../etc/passwd"));
        assert!(!AssetKey::is_safe("a/b.png"));
        assert!(!AssetKey::is_safe(".hidden"));
        assert!(!AssetKey::is_safe(""));
    }
}
