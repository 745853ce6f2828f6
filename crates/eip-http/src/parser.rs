// # Response Parsers
//
// Turn the text a web service returned into an IP address.
//
// Each parser also declares how many bytes of response it is willing to
// read; `HttpProvider` stops reading and reports a parse failure as soon as
// a response grows past that limit.

use eip_core::ProviderError;
use std::net::IpAddr;

/// Longest textual IP address (IPv6 with an embedded IPv4 suffix)
pub const MAX_ADDRESS_TEXT_LEN: usize = 45;

/// Read limit for bare address responses: the address plus line-ending slack
pub const PLAIN_TEXT_BODY_LIMIT: usize = 64;

/// Read limit for small JSON documents such as `{"ip":"..."}`
pub const JSON_BODY_LIMIT: usize = 256;

/// Read limit for `key=value` diagnostic pages
pub const KEY_VALUE_BODY_LIMIT: usize = 1024;

/// Interprets a web service response
pub trait ResponseParser: Send + Sync {
    /// Parse the full response body into an address
    fn parse(&self, body: &str) -> Result<IpAddr, ProviderError>;

    /// Maximum number of response bytes to read
    fn body_limit(&self) -> usize;
}

/// Response is nothing but the address, possibly surrounded by whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl ResponseParser for PlainTextParser {
    fn parse(&self, body: &str) -> Result<IpAddr, ProviderError> {
        parse_address(body.trim())
    }

    fn body_limit(&self) -> usize {
        PLAIN_TEXT_BODY_LIMIT
    }
}

/// Response is a JSON object with the address in one string field
#[derive(Debug, Clone)]
pub struct JsonFieldParser {
    field: String,
}

impl JsonFieldParser {
    /// Create a parser reading the address from `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl ResponseParser for JsonFieldParser {
    fn parse(&self, body: &str) -> Result<IpAddr, ProviderError> {
        let document: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| ProviderError::parse(format!("Invalid JSON: {}", e)))?;

        let value = document
            .get(&self.field)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                ProviderError::parse(format!("Missing string field '{}'", self.field))
            })?;

        parse_address(value.trim())
    }

    fn body_limit(&self) -> usize {
        JSON_BODY_LIMIT
    }
}

/// Response is a list of `key=value` lines, one of which holds the address
#[derive(Debug, Clone)]
pub struct KeyValueParser {
    key: String,
}

impl KeyValueParser {
    /// Create a parser reading the address from the line keyed `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl ResponseParser for KeyValueParser {
    fn parse(&self, body: &str) -> Result<IpAddr, ProviderError> {
        let value = body
            .lines()
            .filter_map(|line| line.split_once('='))
            .find(|(key, _)| key.trim() == self.key)
            .map(|(_, value)| value)
            .ok_or_else(|| ProviderError::parse(format!("Missing key '{}'", self.key)))?;

        parse_address(value.trim())
    }

    fn body_limit(&self) -> usize {
        KEY_VALUE_BODY_LIMIT
    }
}

fn parse_address(text: &str) -> Result<IpAddr, ProviderError> {
    if text.is_empty() {
        return Err(ProviderError::parse("Empty address"));
    }
    if text.len() > MAX_ADDRESS_TEXT_LEN {
        return Err(ProviderError::parse(format!(
            "Address text too long ({} chars)",
            text.len()
        )));
    }

    text.parse()
        .map_err(|_| ProviderError::parse(format!("Invalid IP address: {}", text)))
}
