use crate::core::errors::UpbitError;
use std::collections::BTreeMap;
use std::fmt;
use url::form_urlencoded::byte_serialize;

/// A request parameter value: a scalar or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

/// Key-sorted request parameters.
///
/// [`QueryParams::encode`] produces the canonical query string. It is both the
/// input of the JWT query hash and the exact string put on the wire, so the two
/// can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: BTreeMap<String, ParamValue>,
}

fn list_key(key: &str) -> String {
    key.strip_suffix("[]").unwrap_or(key).to_string()
}

fn encode_component(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a scalar value.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style insert of an optional scalar; `None` leaves the params untouched.
    pub fn with_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    /// Builder-style insert of a list value. Empty lists are skipped.
    pub fn with_list<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.insert_list(key, values);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries
            .insert(key.into(), ParamValue::Single(value.to_string()));
    }

    /// Insert a list value. A trailing `[]` on the key is optional.
    pub fn insert_list<I, V>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let values: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        if !values.is_empty() {
            self.entries.insert(list_key(key), ParamValue::List(values));
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Canonical form-urlencoded string: keys sorted, list entries as `key[]=v`.
    pub fn encode(&self) -> String {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let key = encode_component(key);
            match value {
                ParamValue::Single(v) => pairs.push(format!("{}={}", key, encode_component(v))),
                ParamValue::List(values) => {
                    for v in values {
                        pairs.push(format!("{}[]={}", key, encode_component(v)));
                    }
                }
            }
        }
        pairs.join("&")
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Parsed `Remaining-Req` header, e.g. `group=default; min=1799; sec=29`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemainingReq {
    pub group: String,
    pub min: Option<u32>,
    pub sec: u32,
}

impl RemainingReq {
    pub fn parse(header: &str) -> Result<Self, UpbitError> {
        let malformed = || UpbitError::RateLimitHeader(header.to_string());

        let mut group = None;
        let mut min = None;
        let mut sec = None;

        for part in header.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(malformed)?;
            let value = value.trim();
            match key.trim() {
                "group" if !value.is_empty() => group = Some(value.to_string()),
                "min" => min = Some(value.parse::<u32>().map_err(|_| malformed())?),
                "sec" => sec = Some(value.parse::<u32>().map_err(|_| malformed())?),
                _ => {}
            }
        }

        Ok(Self {
            group: group.ok_or_else(malformed)?,
            min,
            sec: sec.ok_or_else(malformed)?,
        })
    }
}

/// Decoded response body plus the rate-limit budget reported with it.
#[derive(Debug, Clone)]
pub struct RestResponse<T> {
    pub data: T,
    pub remaining_req: Option<RemainingReq>,
}

impl<T> RestResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RestResponse<U> {
        RestResponse {
            data: f(self.data),
            remaining_req: self.remaining_req,
        }
    }
}
