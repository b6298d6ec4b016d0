use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

/// Deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Local,
    Sandbox,
    Preprod,
    Production,
    Canary,
    #[default]
    Test,
    Tin,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "LOCAL",
            Environment::Sandbox => "SANDBOX",
            Environment::Preprod => "PREPROD",
            Environment::Production => "PRODUCTION",
            Environment::Canary => "CANARY",
            Environment::Test => "TEST",
            Environment::Tin => "TIN",
        }
    }

    /// Origin of the hosted payment surface. Empty for [`Environment::Local`],
    /// where every URL is page relative.
    pub fn origin(&self) -> &'static str {
        match self {
            Environment::Local => "",
            Environment::Preprod => "https://pay-preprod.sandbox.google.com",
            Environment::Sandbox => "https://pay.sandbox.google.com",
            Environment::Canary => "https://ibfe-canary.corp.google.com",
            _ => "https://pay.google.com",
        }
    }

    pub fn base_path(&self) -> String {
        format!("{}/gp/p", self.origin())
    }

    pub fn hosting_page_url(&self) -> String {
        match self {
            Environment::Tin => "/ui/pay".to_string(),
            _ => format!("{}/ui/pay", self.base_path()),
        }
    }

    /// Endpoint that exchanges an encrypted redirect payload for cleartext.
    ///
    /// Relative paths (LOCAL) are resolved against `page_origin`.
    pub fn decryption_url(
        &self,
        page_origin: &Url,
        redirect_key: Option<&str>,
    ) -> Result<Url, url::ParseError> {
        let mut url = page_origin.join(&format!("{}/apis/buyflow/process", self.base_path()))?;
        if let Some(key) = redirect_key.filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("rk", key);
        }
        Ok(url)
    }

    /// URL loaded into the checkout iframe.
    pub fn iframe_url(&self, origin: &str, coordination_token: &str) -> String {
        let host = match self {
            Environment::Canary => "https://ibfe-canary.corp.google.com",
            Environment::Sandbox => "https://pay.sandbox.google.com",
            Environment::Preprod => "https://pay-preprod.sandbox.google.com",
            _ => "https://pay.google.com",
        };
        format!("{host}/gp/p/ui/pay?origin={origin}&coordination_token={coordination_token}")
    }

    /// URL of the hidden logging frame.
    pub fn payframe_url(&self, origin: &str, merchant_id: Option<&str>) -> String {
        let host = match self {
            Environment::Canary => "https://ibfe-canary.corp.google.com",
            Environment::Preprod => "https://pay-preprod.sandbox.google.com",
            Environment::Sandbox => "https://pay.sandbox.google.com",
            _ => "https://pay.google.com",
        };
        format!(
            "{host}/gp/p/ui/payframe?origin={origin}&mid={}",
            merchant_id.unwrap_or_default()
        )
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCAL" => Ok(Environment::Local),
            "SANDBOX" => Ok(Environment::Sandbox),
            "PREPROD" => Ok(Environment::Preprod),
            "PRODUCTION" => Ok(Environment::Production),
            "CANARY" => Ok(Environment::Canary),
            "TEST" => Ok(Environment::Test),
            "TIN" => Ok(Environment::Tin),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origins() {
        assert_eq!(Environment::Production.origin(), "https://pay.google.com");
        assert_eq!(Environment::Test.origin(), "https://pay.google.com");
        assert_eq!(
            Environment::Sandbox.base_path(),
            "https://pay.sandbox.google.com/gp/p"
        );
        assert_eq!(Environment::Local.base_path(), "/gp/p");
        assert_eq!(Environment::Tin.hosting_page_url(), "/ui/pay");
        assert_eq!(
            Environment::Preprod.hosting_page_url(),
            "https://pay-preprod.sandbox.google.com/gp/p/ui/pay"
        );
    }

    #[test]
    fn test_decryption_url() {
        let page = Url::parse("https://merchant.example/checkout").unwrap();

        let url = Environment::Production
            .decryption_url(&page, Some("a b&c"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://pay.google.com/gp/p/apis/buyflow/process?rk=a+b%26c"
        );

        let local = Environment::Local.decryption_url(&page, None).unwrap();
        assert_eq!(
            local.as_str(),
            "https://merchant.example/gp/p/apis/buyflow/process"
        );
    }

    #[test]
    fn test_iframe_urls() {
        assert_eq!(
            Environment::Sandbox.iframe_url("https://m.example", "tok"),
            "https://pay.sandbox.google.com/gp/p/ui/pay?origin=https://m.example&coordination_token=tok"
        );
        assert_eq!(
            Environment::Test.payframe_url("https://m.example", Some("123")),
            "https://pay.google.com/gp/p/ui/payframe?origin=https://m.example&mid=123"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("PRODUCTION".parse::<Environment>(), Ok(Environment::Production));
        assert!("production".parse::<Environment>().is_err());
    }
}
