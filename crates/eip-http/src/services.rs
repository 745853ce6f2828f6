// # Built-in Web Services
//
// Public services that answer a plain GET with the caller's address.
// Endpoints are fixed per service; adding a service means adding an entry
// here, nothing in the engine changes.

use crate::parser::{JsonFieldParser, KeyValueParser, PlainTextParser, ResponseParser};

/// How a service formats its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Bare address text
    PlainText,
    /// JSON object; the address is in the named string field
    JsonField(&'static str),
    /// `key=value` lines; the address is under the named key
    KeyValue(&'static str),
}

impl ResponseFormat {
    /// Build the parser for this format
    pub fn parser(&self) -> Box<dyn ResponseParser> {
        match self {
            ResponseFormat::PlainText => Box::new(PlainTextParser),
            ResponseFormat::JsonField(field) => Box::new(JsonFieldParser::new(*field)),
            ResponseFormat::KeyValue(key) => Box::new(KeyValueParser::new(*key)),
        }
    }
}

/// A built-in web service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDefinition {
    /// Provider identifier used in the registry and in logs
    pub name: &'static str,
    /// Fixed endpoint URL
    pub endpoint: &'static str,
    /// Response format of the endpoint
    pub format: ResponseFormat,
}

/// Every service shipped with this crate
pub const BUILTIN_SERVICES: &[ServiceDefinition] = &[
    ServiceDefinition {
        name: "amazon",
        endpoint: "http://checkip.amazonaws.com",
        format: ResponseFormat::PlainText,
    },
    ServiceDefinition {
        name: "cloudflare",
        endpoint: "https://www.cloudflare.com/cdn-cgi/trace",
        format: ResponseFormat::KeyValue("ip"),
    },
    ServiceDefinition {
        name: "icanhazip",
        endpoint: "https://icanhazip.com",
        format: ResponseFormat::PlainText,
    },
    ServiceDefinition {
        name: "ifconfig",
        endpoint: "https://ifconfig.me/ip",
        format: ResponseFormat::PlainText,
    },
    ServiceDefinition {
        name: "ipify",
        endpoint: "https://api.ipify.org?format=json",
        format: ResponseFormat::JsonField("ip"),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn service_names_are_unique() {
        let names: HashSet<_> = BUILTIN_SERVICES.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), BUILTIN_SERVICES.len());
    }

    #[test]
    fn every_endpoint_is_a_valid_url() {
        for service in BUILTIN_SERVICES {
            assert!(
                reqwest::Url::parse(service.endpoint).is_ok(),
                "{} has a malformed endpoint",
                service.name
            );
        }
    }
}
