// ABOUTME: Provisioning state snapshot built once per hook from external inputs.
// ABOUTME: Validates the bound address and proxy URLs; malformed input is fatal here.

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Proxy environment variables set by the hosting agent.
pub const HTTP_PROXY_ENV: &str = "JUJU_CHARM_HTTP_PROXY";
pub const HTTPS_PROXY_ENV: &str = "JUJU_CHARM_HTTPS_PROXY";
pub const NO_PROXY_ENV: &str = "JUJU_CHARM_NO_PROXY";

/// Network or proxy input that cannot be used to provision the host.
#[derive(Error, Debug)]
pub enum InvalidStateError {
    #[error("invalid bind address '{value}': expected an IP address or hostname")]
    InvalidAddress { value: String },

    #[error("invalid {name} URL '{value}': {source}")]
    InvalidProxyUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid {name} URL '{value}': {reason}")]
    UnsupportedProxyUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Address the relay binds to and advertises to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAddress {
    Ip(IpAddr),
    Hostname(String),
}

impl FromStr for BindAddress {
    type Err = InvalidStateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Ok(ip) = value.parse::<IpAddr>() {
            return Ok(BindAddress::Ip(ip));
        }
        if is_valid_hostname(value) {
            return Ok(BindAddress::Hostname(value.to_ascii_lowercase()));
        }
        Err(InvalidStateError::InvalidAddress {
            value: value.to_string(),
        })
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindAddress::Ip(ip) => write!(f, "{ip}"),
            BindAddress::Hostname(name) => f.write_str(name),
        }
    }
}

/// RFC 1123 hostname: dot separated labels of letters, digits, and inner hyphens.
fn is_valid_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    if value.is_empty() || value.len() > 253 {
        return false;
    }
    value.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Raw proxy values as read from the environment or CLI.
#[derive(Debug, Clone, Default)]
pub struct ProxyInputs {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxyInputs {
    /// Read the hosting agent's proxy variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            http_proxy: lookup(HTTP_PROXY_ENV),
            https_proxy: lookup(HTTPS_PROXY_ENV),
            no_proxy: lookup(NO_PROXY_ENV),
        }
    }
}

/// Validated proxy settings for the container runtime.
///
/// Only exists when at least one proxy URL is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyConfig {
    #[serde(rename = "http-proxy", skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(rename = "https-proxy", skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(rename = "no-proxy", skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

impl ProxyConfig {
    pub fn from_inputs(inputs: &ProxyInputs) -> Result<Option<Self>, InvalidStateError> {
        let http_proxy = validate_proxy_url("http proxy", non_empty(&inputs.http_proxy))?;
        let https_proxy = validate_proxy_url("https proxy", non_empty(&inputs.https_proxy))?;

        if http_proxy.is_none() && https_proxy.is_none() {
            return Ok(None);
        }

        Ok(Some(Self {
            http_proxy,
            https_proxy,
            no_proxy: non_empty(&inputs.no_proxy).map(str::to_string),
        }))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_proxy_url(
    name: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, InvalidStateError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let url = url::Url::parse(value).map_err(|e| InvalidStateError::InvalidProxyUrl {
        name,
        value: value.to_string(),
        source: e,
    })?;
    if url.host_str().is_none() {
        return Err(InvalidStateError::UnsupportedProxyUrl {
            name,
            value: value.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(Some(value.to_string()))
}

/// Everything a hook needs to know about the host, captured once at hook start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningState {
    /// `None` until the network layer assigns an address
    pub bound_address: Option<BindAddress>,
    pub proxy_config: Option<ProxyConfig>,
}

impl ProvisioningState {
    pub fn from_inputs(
        bound_address: Option<&str>,
        proxy: &ProxyInputs,
    ) -> Result<Self, InvalidStateError> {
        let bound_address = bound_address
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(BindAddress::from_str)
            .transpose()?;

        Ok(Self {
            bound_address,
            proxy_config: ProxyConfig::from_inputs(proxy)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn proxy_inputs(http: Option<&str>, https: Option<&str>, no: Option<&str>) -> ProxyInputs {
        ProxyInputs {
            http_proxy: http.map(String::from),
            https_proxy: https.map(String::from),
            no_proxy: no.map(String::from),
        }
    }

    #[test]
    fn test_ipv4_address() {
        let addr: BindAddress = "10.0.0.10".parse().unwrap();
        assert_eq!(addr, BindAddress::Ip("10.0.0.10".parse().unwrap()));
        assert_eq!(addr.to_string(), "10.0.0.10");
    }

    #[test]
    fn test_ipv6_address() {
        let addr: BindAddress = "fd42::1".parse().unwrap();
        assert_eq!(addr.to_string(), "fd42::1");
    }

    #[test]
    fn test_hostname_address() {
        let addr: BindAddress = "Tmate.Example.com".parse().unwrap();
        assert_eq!(addr, BindAddress::Hostname("tmate.example.com".to_string()));
    }

    #[test]
    fn test_invalid_address() {
        let err = "invalid_address".parse::<BindAddress>().unwrap_err();
        assert!(matches!(err, InvalidStateError::InvalidAddress { .. }));
        assert!("-leading.example".parse::<BindAddress>().is_err());
        assert!("a..b".parse::<BindAddress>().is_err());
    }

    #[test]
    fn test_unbound_address() {
        let state = ProvisioningState::from_inputs(None, &ProxyInputs::default()).unwrap();
        assert!(state.bound_address.is_none());

        let state = ProvisioningState::from_inputs(Some("  "), &ProxyInputs::default()).unwrap();
        assert!(state.bound_address.is_none());
    }

    #[test]
    fn test_state_rejects_invalid_address() {
        let result = ProvisioningState::from_inputs(Some("invalid_address"), &ProxyInputs::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_no_proxy_urls_means_no_proxy_config() {
        let inputs = proxy_inputs(None, Some(""), Some("localhost"));
        assert_eq!(ProxyConfig::from_inputs(&inputs).unwrap(), None);
    }

    #[test]
    fn test_partial_proxy_config() {
        let inputs = proxy_inputs(Some("http://proxy.address:3128"), None, None);
        let proxy = ProxyConfig::from_inputs(&inputs).unwrap().unwrap();
        assert_eq!(proxy.http_proxy.as_deref(), Some("http://proxy.address:3128"));
        assert_eq!(proxy.https_proxy, None);
        assert_eq!(proxy.no_proxy, None);
    }

    #[test]
    fn test_full_proxy_config() {
        let inputs = proxy_inputs(
            Some("http://proxy.address:3128"),
            Some("https://proxy.address:3128"),
            Some("http://hello.org,http://goodbye.org"),
        );
        let proxy = ProxyConfig::from_inputs(&inputs).unwrap().unwrap();
        assert_eq!(
            proxy.no_proxy.as_deref(),
            Some("http://hello.org,http://goodbye.org")
        );
    }

    #[test]
    fn test_malformed_proxy_url() {
        let inputs = proxy_inputs(Some("not a url"), None, None);
        let err = ProxyConfig::from_inputs(&inputs).unwrap_err();
        assert!(matches!(err, InvalidStateError::InvalidProxyUrl { .. }));
    }

    #[test]
    fn test_proxy_url_without_host() {
        let inputs = proxy_inputs(None, Some("unix:/run/proxy.sock"), None);
        let err = ProxyConfig::from_inputs(&inputs).unwrap_err();
        assert!(err.to_string().contains("missing host"));
    }

    #[test]
    fn test_proxy_inputs_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            (HTTP_PROXY_ENV, "http://squid:3128"),
            (NO_PROXY_ENV, "127.0.0.1"),
        ]);
        let inputs = ProxyInputs::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(inputs.http_proxy.as_deref(), Some("http://squid:3128"));
        assert_eq!(inputs.https_proxy, None);
        assert_eq!(inputs.no_proxy.as_deref(), Some("127.0.0.1"));
    }
}
