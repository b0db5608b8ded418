use crate::models::FileDescriptor;
use http::header::{HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashMap};

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

const META_PREFIX: &str = "x-amz-meta-";

/// Header map for one object write, ordered for stable logging.
pub type HeaderMap = BTreeMap<String, String>;

/// Merges the configured default headers with the per-file length and type.
///
/// Header names compare case-insensitively; the computed entries always win.
pub fn compose_headers(defaults: &HashMap<String, String>, file: &FileDescriptor) -> HeaderMap {
    let mut headers: HeaderMap = defaults
        .iter()
        .filter(|(name, _)| {
            !name.eq_ignore_ascii_case(CONTENT_LENGTH) && !name.eq_ignore_ascii_case(CONTENT_TYPE)
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    headers.insert(CONTENT_LENGTH.to_string(), file.size.to_string());
    headers.insert(CONTENT_TYPE.to_string(), file.mime_type.clone());
    headers
}

/// A composed header map split into what S3 accepts as native object
/// parameters and what has to travel as a raw request header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders {
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub metadata: HashMap<String, String>,
    pub extra: Vec<(String, String)>,
}

impl ObjectHeaders {
    pub fn from_map(headers: &HeaderMap) -> Self {
        let mut out = Self::default();
        for (name, value) in headers {
            let lower = name.to_ascii_lowercase();
            match lower.as_str() {
                "content-length" => out.content_length = value.parse().ok(),
                "content-type" => out.content_type = Some(value.clone()),
                "cache-control" => out.cache_control = Some(value.clone()),
                "content-disposition" => out.content_disposition = Some(value.clone()),
                "content-encoding" => out.content_encoding = Some(value.clone()),
                "content-language" => out.content_language = Some(value.clone()),
                _ => match lower.strip_prefix(META_PREFIX) {
                    Some(meta) if !meta.is_empty() => {
                        out.metadata.insert(meta.to_string(), value.clone());
                    }
                    _ if is_valid_header(&lower, value) => {
                        out.extra.push((lower.clone(), value.clone()));
                    }
                    _ => tracing::warn!("Dropping invalid header '{}'", name),
                },
            }
        }
        out
    }

    pub fn metadata(&self) -> Option<HashMap<String, String>> {
        (!self.metadata.is_empty()).then(|| self.metadata.clone())
    }
}

fn is_valid_header(name: &str, value: &str) -> bool {
    HeaderName::from_bytes(name.as_bytes()).is_ok() && HeaderValue::from_str(value).is_ok()
}
