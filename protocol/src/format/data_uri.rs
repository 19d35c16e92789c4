//! `data:` URIs, in the restricted shape the wire format uses:
//!
//! ```text
//! data:image/png;base64,iVBORw0KGgo...
//! base64,iVBORw0KGgo...
//! ```
//!
//! The second form (no scheme, no MIME type) is how transportable data with
//! a non-default encoding is written.

use std::fmt;

use serde_json::{Map, Value};

use crate::config::ENCODE_BASE64;

const SCHEME: &str = "data:";

/// An encoding tag is at most this many chars ("base64" + slack), so longer
/// text before the first comma is plain text, not an `algo,` prefix.
const MAX_ALGORITHM_PREFIX: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: Option<String>,
    pub algorithm: String,
    pub body: String,
}

impl DataUri {
    pub fn new(mime_type: Option<String>, algorithm: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            mime_type,
            algorithm: algorithm.into(),
            body: body.into(),
        }
    }

    /// Split `text` into its parts. Returns `None` for bare text or URLs.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let (head, body) = match text.strip_prefix(SCHEME) {
            Some(rest) => rest.split_once(',')?,
            None => {
                let pos = text.find(',')?;
                if pos > MAX_ALGORITHM_PREFIX {
                    return None;
                }
                (&text[..pos], &text[pos + 1..])
            }
        };
        match head.split_once(';') {
            Some((mime, algorithm)) if !mime.is_empty() => {
                Some(Self::new(Some(mime.to_string()), algorithm, body))
            }
            Some(_) => None,
            None => Some(Self::new(None, head, body)),
        }
    }

    /// `{ "mime-type"?, "algorithm", "data" }`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut info = Map::new();
        if let Some(mime) = &self.mime_type {
            info.insert("mime-type".into(), Value::String(mime.clone()));
        }
        info.insert("algorithm".into(), Value::String(self.algorithm.clone()));
        info.insert("data".into(), Value::String(self.body.clone()));
        info
    }

    /// Build a `data:` URI from a file map, if the map carries nothing a URI
    /// cannot express. Requires `data` and `mime-type`; `algorithm` defaults
    /// to base64; `filename` is tolerated and dropped.
    pub fn build(info: &Map<String, Value>) -> Option<String> {
        let data = info.get("data")?.as_str()?;
        let mime = info.get("mime-type")?.as_str()?;
        let mut extra = info.len() - 2;
        if info.contains_key("filename") {
            extra -= 1;
        }
        let algorithm = match info.get("algorithm") {
            Some(value) => {
                extra -= 1;
                value.as_str()?
            }
            None => ENCODE_BASE64,
        };
        if extra != 0 {
            return None;
        }
        Some(format!("{SCHEME}{mime};{algorithm},{data}"))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mime_type {
            Some(mime) => write!(f, "{SCHEME}{mime};{},{}", self.algorithm, self.body),
            None => write!(f, "{},{}", self.algorithm, self.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_uri() {
        let uri = DataUri::parse("data:image/png;base64,bW9reQ==").unwrap();
        assert_eq!(uri.mime_type.as_deref(), Some("image/png"));
        assert_eq!(uri.algorithm, "base64");
        assert_eq!(uri.body, "bW9reQ==");
        assert_eq!(uri.to_string(), "data:image/png;base64,bW9reQ==");
    }

    #[test]
    fn parses_algorithm_prefix() {
        let uri = DataUri::parse("hex,6d6f6b79").unwrap();
        assert_eq!(uri.mime_type, None);
        assert_eq!(uri.algorithm, "hex");
        assert_eq!(uri.to_string(), "hex,6d6f6b79");
    }

    #[test]
    fn plain_text_and_urls_are_not_data_uris() {
        assert!(DataUri::parse("bW9reQ==").is_none());
        assert!(DataUri::parse("https://example.com/a,b").is_none());
        assert!(DataUri::parse("").is_none());
        assert!(DataUri::parse("data:no-comma").is_none());
    }

    #[test]
    fn build_requires_data_and_mime() {
        let info = json!({"data": "bW9reQ==", "mime-type": "image/png", "filename": "a.png"});
        assert_eq!(
            DataUri::build(info.as_object().unwrap()).unwrap(),
            "data:image/png;base64,bW9reQ=="
        );
        let no_mime = json!({"data": "bW9reQ=="});
        assert!(DataUri::build(no_mime.as_object().unwrap()).is_none());
    }

    #[test]
    fn build_refuses_extra_fields() {
        let info = json!({"data": "x", "mime-type": "image/png", "URL": "https://x"});
        assert!(DataUri::build(info.as_object().unwrap()).is_none());
    }
}
