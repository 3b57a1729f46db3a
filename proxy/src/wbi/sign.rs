use std::collections::BTreeMap;
use std::sync::Arc;

use md5::{Digest, Md5};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::SignError;
use crate::wbi::keys::KeyManager;
use crate::wbi::tables::{SIGNATURE_PARAM, TIMESTAMP_PARAM};

/// Everything except `A-Z a-z 0-9 - _ . ~` is escaped, matching how the
/// upstream canonicalizes query strings before hashing.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Request parameters, kept sorted by name.
pub type Params = BTreeMap<String, String>;

/// A parameter set carrying its `wts` timestamp and `w_rid` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    params: Params,
}

impl SignedQuery {
    pub fn signature(&self) -> &str {
        self.params.get(SIGNATURE_PARAM).map(String::as_str).unwrap_or_default()
    }

    pub fn timestamp(&self) -> &str {
        self.params.get(TIMESTAMP_PARAM).map(String::as_str).unwrap_or_default()
    }

    /// Final query string, signature included, in ascending name order.
    pub fn query(&self) -> String {
        encode_query(&self.params)
    }
}

/// Signs parameter sets with the current mixin key from a [`KeyManager`].
#[derive(Clone)]
pub struct WbiSigner {
    keys: Arc<KeyManager>,
}

impl WbiSigner {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    pub async fn sign(&self, params: Params) -> Result<SignedQuery, SignError> {
        let keys = self.keys.get_keys().await?;
        Ok(sign_with(params, &keys.mixin_key, chrono::Utc::now().timestamp()))
    }
}

/// Pure signing step: inject `wts`, hash the canonical query with the mixin
/// key, and attach the lowercase hex digest as `w_rid`.
pub fn sign_with(mut params: Params, mixin_key: &str, wts: i64) -> SignedQuery {
    params.remove(SIGNATURE_PARAM);
    params.insert(TIMESTAMP_PARAM.to_string(), wts.to_string());

    let canonical = encode_query(&params);
    let digest = Md5::digest(format!("{canonical}{mixin_key}").as_bytes());

    params.insert(SIGNATURE_PARAM.to_string(), hex::encode(digest));
    SignedQuery { params }
}

/// Form-encode `name=value` pairs in ascending name order, joined by `&`.
/// Spaces become `+`.
pub fn encode_query(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn escape(s: &str) -> String {
    // A literal '%' is itself escaped, so "%20" here only ever came from a space.
    utf8_percent_encode(s, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}
