//! DigitalOcean droplets as fleet members.
//!
//! Talks to the public v2 REST API with a bearer token. Everything except
//! the droplet name comes from the `[digitalocean]` configuration section.

use fleetscale_core::{DigitalOceanConfig, ProviderIdentity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ActionOutcome, CreateRequest, FleetMember, Provider};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/v2";

/// Droplets requested per page when listing.
const PAGE_SIZE: u32 = 200;

pub struct DigitalOceanProvider {
    client: reqwest::Client,
    base_url: String,
    config: DigitalOceanConfig,
}

#[derive(Serialize)]
struct CreateDroplet<'a> {
    name: &'a str,
    region: &'a str,
    size: &'a str,
    image: &'a str,
    ssh_keys: &'a [String],
    private_networking: bool,
    backups: bool,
    ipv6: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<&'a str>,
    tags: &'a [String],
}

#[derive(Deserialize)]
struct DropletPage {
    droplets: Vec<Droplet>,
    #[serde(default)]
    links: Links,
}

#[derive(Deserialize, Default)]
struct Links {
    #[serde(default)]
    pages: Pages,
}

#[derive(Deserialize, Default)]
struct Pages {
    next: Option<String>,
}

#[derive(Deserialize)]
struct Droplet {
    id: u64,
    name: String,
    #[serde(default)]
    networks: Networks,
}

#[derive(Deserialize, Default)]
struct Networks {
    #[serde(default)]
    v4: Vec<NetworkV4>,
}

#[derive(Deserialize)]
struct NetworkV4 {
    ip_address: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

impl From<Droplet> for FleetMember {
    fn from(droplet: Droplet) -> Self {
        let mut member = FleetMember::named(droplet.id.to_string(), droplet.name);
        for network in droplet.networks.v4 {
            match network.kind.as_str() {
                "private" => member.private_addresses.push(network.ip_address),
                "public" => member.public_addresses.push(network.ip_address),
                _ => {}
            }
        }
        member
    }
}

impl DigitalOceanProvider {
    pub fn new(config: DigitalOceanConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetscale/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = config
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn droplet_body<'a>(&'a self, name: &'a str) -> CreateDroplet<'a> {
        CreateDroplet {
            name,
            region: &self.config.naming.region,
            size: &self.config.size,
            image: &self.config.image,
            ssh_keys: &self.config.ssh_keys,
            private_networking: self.config.private_networking,
            backups: self.config.backups,
            ipv6: self.config.ipv6,
            user_data: self.config.user_data.as_deref(),
            tags: &self.config.tags,
        }
    }
}

/// Best-effort human message from an error response body.
async fn api_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<ApiMessage>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    }
}

impl Provider for DigitalOceanProvider {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::DigitalOcean
    }

    async fn create(&self, request: &CreateRequest) -> ProviderResult<ActionOutcome> {
        let body = self.droplet_body(&request.name);
        let resp = self
            .client
            .post(self.url("droplets"))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;

        if resp.status().is_success() {
            info!(name = %request.name, region = %self.config.naming.region, "droplet created");
            Ok(ActionOutcome::succeeded(format!(
                "created droplet {}",
                request.name
            )))
        } else {
            Ok(ActionOutcome::failed(api_message(resp).await))
        }
    }

    async fn list_all(&self) -> ProviderResult<Vec<FleetMember>> {
        let endpoint = self.url("droplets");
        let mut members = Vec::new();
        let mut page = 1u32;

        loop {
            let resp = self
                .client
                .get(&endpoint)
                .bearer_auth(&self.config.token)
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(ProviderError::Response {
                    endpoint,
                    message: api_message(resp).await,
                });
            }

            let body: DropletPage = resp.json().await?;
            let last = body.links.pages.next.is_none() || body.droplets.is_empty();
            members.extend(body.droplets.into_iter().map(FleetMember::from));

            if last {
                break;
            }
            page += 1;
        }

        debug!(count = members.len(), pages = page, "droplets listed");
        Ok(members)
    }

    async fn destroy(&self, id: &str) -> ProviderResult<ActionOutcome> {
        let resp = self
            .client
            .delete(self.url(&format!("droplets/{id}")))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if resp.status().is_success() {
            info!(%id, "droplet destroyed");
            Ok(ActionOutcome::succeeded(format!("destroyed droplet {id}")))
        } else {
            Ok(ActionOutcome::failed(api_message(resp).await))
        }
    }
}
