//! # Portable Network Files
//!
//! A PNF describes a file by value, by reference, or both: inline data as a
//! TED, a download URL, a display filename, and the symmetric key needed to
//! decrypt the download. It takes the most compact wire form that loses
//! nothing:
//!
//! ```text
//! "https://cdn.example.com/avatar.png"          URL (+ filename) only
//! "data:image/png;base64,iVBORw0KGgo..."        inline data (+ filename) only
//! { "URL": ..., "filename": ..., "password": {...} }
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use super::data_uri::DataUri;
use super::ted::{json_map, TransportableData};
use super::FormatError;
use crate::crypto::KeyMap;
use crate::extensions::Extensions;

const URL_SCHEME_SEPARATOR: &str = "://";

/// A file by value and/or by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PortableNetworkFile {
    data: Option<TransportableData>,
    filename: Option<String>,
    url: Option<String>,
    password: Option<KeyMap>,
}

impl PortableNetworkFile {
    /// Fails when there is neither data, URL nor filename to describe.
    pub fn new(
        data: Option<TransportableData>,
        filename: Option<String>,
        url: Option<String>,
        password: Option<KeyMap>,
    ) -> Result<Self, FormatError> {
        if data.is_none() && filename.is_none() && url.is_none() {
            return Err(FormatError::Malformed(
                "file needs data, a URL or a filename".into(),
            ));
        }
        Ok(Self {
            data,
            filename,
            url,
            password,
        })
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            data: None,
            filename: None,
            url: Some(url.into()),
            password: None,
        }
    }

    pub fn data(&self) -> Option<&TransportableData> {
        self.data.as_ref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Wire form of the decryption key for the downloaded content.
    pub fn password(&self) -> Option<&KeyMap> {
        self.password.as_ref()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut info = Map::new();
        if let Some(ted) = &self.data {
            info.extend(ted.to_map());
        }
        if let Some(filename) = &self.filename {
            info.insert("filename".into(), Value::String(filename.clone()));
        }
        if let Some(url) = &self.url {
            info.insert("URL".into(), Value::String(url.clone()));
        }
        if let Some(password) = &self.password {
            info.insert("password".into(), Value::Object(password.clone()));
        }
        info
    }

    /// The compact wire form; see the module docs.
    pub fn to_value(&self) -> Value {
        let info = self.to_map();
        if let Some(url) = &self.url {
            if url.starts_with("data:") || (self.data.is_none() && self.password.is_none()) {
                return Value::String(url.clone());
            }
            return Value::Object(info);
        }
        match DataUri::build(&info) {
            Some(uri) if self.password.is_none() => Value::String(uri),
            _ => Value::Object(info),
        }
    }
}

/// Normalise any wire form of a PNF into its map form.
pub fn pnf_fields(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) => {
            if let Some(map) = json_map(text) {
                return Some(map);
            }
            if let Some(uri) = DataUri::parse(text) {
                return Some(uri.to_map());
            }
            if text.contains(URL_SCHEME_SEPARATOR) {
                let mut info = Map::new();
                info.insert("URL".into(), Value::String(text.clone()));
                return Some(info);
            }
            None
        }
        _ => None,
    }
}

/// Creates and parses PNFs.
pub trait PnfFactory: Send + Sync {
    fn create_pnf(
        &self,
        data: Option<TransportableData>,
        filename: Option<String>,
        url: Option<String>,
        password: Option<KeyMap>,
    ) -> Result<PortableNetworkFile, FormatError>;

    /// Build from the normalised map form. Inline data is decoded through
    /// the TED registry of `ext`.
    fn parse_pnf(
        &self,
        info: &Map<String, Value>,
        ext: &Extensions,
    ) -> Result<PortableNetworkFile, FormatError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BaseNetworkFileFactory;

impl BaseNetworkFileFactory {
    pub fn shared() -> Arc<dyn PnfFactory> {
        Arc::new(Self)
    }
}

impl PnfFactory for BaseNetworkFileFactory {
    fn create_pnf(
        &self,
        data: Option<TransportableData>,
        filename: Option<String>,
        url: Option<String>,
        password: Option<KeyMap>,
    ) -> Result<PortableNetworkFile, FormatError> {
        PortableNetworkFile::new(data, filename, url, password)
    }

    fn parse_pnf(
        &self,
        info: &Map<String, Value>,
        ext: &Extensions,
    ) -> Result<PortableNetworkFile, FormatError> {
        let string = |field: &str| {
            info.get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let data = match info.get("data") {
            None | Some(Value::Null) => None,
            Some(body) => {
                let ted = if info.contains_key("algorithm") || info.contains_key("mime-type") {
                    let mut fields = Map::new();
                    for key in ["algorithm", "data", "mime-type"] {
                        if let Some(v) = info.get(key) {
                            fields.insert(key.into(), v.clone());
                        }
                    }
                    Value::Object(fields)
                } else {
                    body.clone()
                };
                Some(ext.parse_ted(&ted)?)
            }
        };
        let password = info.get("password").and_then(Value::as_object).cloned();
        PortableNetworkFile::new(data, string("filename"), string("URL"), password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::PluginLoader;
    use serde_json::json;

    fn loaded() -> Extensions {
        let mut ext = Extensions::new();
        PluginLoader::default().load(&mut ext);
        ext
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(PortableNetworkFile::new(None, None, None, None).is_err());
    }

    #[test]
    fn url_only_serialises_as_string() {
        let pnf = PortableNetworkFile::from_url("https://cdn.example.com/a.png");
        assert_eq!(pnf.to_value(), json!("https://cdn.example.com/a.png"));

        let named = PortableNetworkFile::new(
            None,
            Some("a.png".into()),
            Some("https://cdn.example.com/a.png".into()),
            None,
        )
        .unwrap();
        assert_eq!(named.to_value(), json!("https://cdn.example.com/a.png"));
    }

    #[test]
    fn inline_data_serialises_as_data_uri() {
        let ted = TransportableData::base64(b"moky".to_vec()).with_mime_type("image/png");
        let pnf = PortableNetworkFile::new(Some(ted), None, None, None).unwrap();
        assert_eq!(pnf.to_value(), json!("data:image/png;base64,bW9reQ=="));
    }

    #[test]
    fn encrypted_download_serialises_as_map() {
        let password = json!({"algorithm": "AES", "data": "AAAA"});
        let pnf = PortableNetworkFile::new(
            None,
            Some("a.png".into()),
            Some("https://cdn.example.com/a.png".into()),
            password.as_object().cloned(),
        )
        .unwrap();
        let value = pnf.to_value();
        assert_eq!(value["URL"], "https://cdn.example.com/a.png");
        assert_eq!(value["password"]["algorithm"], "AES");
    }

    #[test]
    fn parse_every_wire_form() {
        let ext = loaded();

        let url = ext.parse_pnf(&json!("https://cdn.example.com/a.png")).unwrap();
        assert_eq!(url.url(), Some("https://cdn.example.com/a.png"));

        let inline = ext.parse_pnf(&json!("data:image/png;base64,bW9reQ==")).unwrap();
        assert_eq!(inline.data().map(|t| t.data()), Some(&b"moky"[..]));
        assert_eq!(inline.data().and_then(|t| t.mime_type()), Some("image/png"));

        let map = ext
            .parse_pnf(&json!({"filename": "a.png", "URL": "https://x.example/a.png"}))
            .unwrap();
        assert_eq!(map.filename(), Some("a.png"));
    }

    #[test]
    fn parse_rejects_plain_text_and_empty_maps() {
        let ext = loaded();
        assert!(ext.parse_pnf(&json!("just some words")).is_err());
        assert!(ext.parse_pnf(&json!({})).is_err());
    }

    #[test]
    fn map_roundtrip_with_password() {
        let ext = loaded();
        let ted = TransportableData::base64(vec![9, 9, 9]);
        let pnf = PortableNetworkFile::new(
            Some(ted),
            Some("blob.bin".into()),
            Some("https://x.example/blob".into()),
            json!({"algorithm": "PLAIN"}).as_object().cloned(),
        )
        .unwrap();
        let parsed = ext.parse_pnf(&pnf.to_value()).unwrap();
        assert_eq!(parsed, pnf);
    }
}
