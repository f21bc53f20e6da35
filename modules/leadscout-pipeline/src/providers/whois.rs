// Domain registration lookups over public WHOIS JSON APIs.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Registration, RegistrationLookup};

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
}

#[derive(Debug, Default, Deserialize)]
struct Party {
    name: Option<String>,
    email: Option<String>,
}

// ---------------------------------------------------------------------------
// whoisjsonapi.com
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct WhoisJsonResponse {
    registrant_name: Option<String>,
    registrant_email: Option<String>,
    admin_name: Option<String>,
    admin_email: Option<String>,
    owner_name: Option<String>,
    owner_email: Option<String>,
    #[serde(default)]
    registrant: Option<Party>,
    #[serde(default)]
    admin: Option<Party>,
}

impl From<WhoisJsonResponse> for Registration {
    fn from(r: WhoisJsonResponse) -> Self {
        let registrant = r.registrant.unwrap_or_default();
        let admin = r.admin.unwrap_or_default();
        Registration {
            registrant_name: r.registrant_name.or(registrant.name),
            registrant_email: r.registrant_email.or(registrant.email),
            admin_name: r.admin_name.or(admin.name),
            admin_email: r.admin_email.or(admin.email),
            owner_name: r.owner_name,
            owner_email: r.owner_email,
        }
    }
}

pub struct WhoisJsonApi {
    client: reqwest::Client,
    base_url: String,
}

impl WhoisJsonApi {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            base_url: "https://whoisjsonapi.com/api/v1".to_string(),
        }
    }
}

impl Default for WhoisJsonApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrationLookup for WhoisJsonApi {
    fn name(&self) -> &str {
        "whoisjsonapi"
    }

    async fn lookup(&self, domain: &str) -> Result<Option<Registration>> {
        let url = format!("{}/{}", self.base_url, domain);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("whoisjsonapi request failed")?;
        if !resp.status().is_success() {
            debug!(domain, status = %resp.status(), "whoisjsonapi: no record");
            return Ok(None);
        }
        let body: WhoisJsonResponse = resp.json().await.context("Failed to parse whoisjsonapi response")?;
        Ok(Some(body.into()))
    }
}

// ---------------------------------------------------------------------------
// domainsbot.com
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct DomainsBotResponse {
    registrant: Option<Party>,
    admin: Option<Party>,
    owner: Option<Party>,
}

impl From<DomainsBotResponse> for Registration {
    fn from(r: DomainsBotResponse) -> Self {
        let registrant = r.registrant.unwrap_or_default();
        let admin = r.admin.unwrap_or_default();
        let owner = r.owner.unwrap_or_default();
        Registration {
            registrant_name: registrant.name,
            registrant_email: registrant.email,
            admin_name: admin.name,
            admin_email: admin.email,
            owner_name: owner.name,
            owner_email: owner.email,
        }
    }
}

pub struct DomainsBot {
    client: reqwest::Client,
    base_url: String,
}

impl DomainsBot {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            base_url: "https://api.domainsbot.com/v2/whois".to_string(),
        }
    }
}

impl Default for DomainsBot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrationLookup for DomainsBot {
    fn name(&self) -> &str {
        "domainsbot"
    }

    async fn lookup(&self, domain: &str) -> Result<Option<Registration>> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("domain", domain)])
            .header("Accept", "application/json")
            .send()
            .await
            .context("domainsbot request failed")?;
        if !resp.status().is_success() {
            debug!(domain, status = %resp.status(), "domainsbot: no record");
            return Ok(None);
        }
        let body: DomainsBotResponse = resp.json().await.context("Failed to parse domainsbot response")?;
        Ok(Some(body.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whoisjson_flat_and_nested_fields() {
        let flat: WhoisJsonResponse =
            serde_json::from_str(r#"{"registrant_email": "r@acme.com", "admin": {"name": "Ana"}}"#).unwrap();
        let reg: Registration = flat.into();
        assert_eq!(reg.email(), Some("r@acme.com"));
        assert_eq!(reg.admin_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn domainsbot_nested_fields() {
        let body: DomainsBotResponse =
            serde_json::from_str(r#"{"owner": {"name": "Luis", "email": "luis@acme.com"}}"#).unwrap();
        let reg: Registration = body.into();
        assert_eq!(reg.email(), Some("luis@acme.com"));
        assert_eq!(reg.name(), Some("Luis"));
    }
}
