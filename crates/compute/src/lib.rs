use cloudstrap_core::config::ProviderCredentials;
use cloudstrap_core::error::CloudstrapError;
use cloudstrap_core::{ComputeService, NodeDetails, SizeHint, Template, TemplateSpec};
use serde::{Deserialize, Serialize};

/// Blocking REST connection to a compute provider. The provider's API
/// endpoint comes from the `<provider>.endpoint` override in its
/// configuration; identity and credential become HTTP basic auth.
///
/// Dropping the connection releases it.
#[derive(Debug)]
pub struct Compute {
    provider_id: String,
    identity: String,
    credential: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct SizesResponse {
    sizes: Vec<SizeEntry>,
}

#[derive(Deserialize)]
struct SizeEntry {
    slug: String,
    memory_mb: u64,
    vcpus: u32,
}

#[derive(Deserialize)]
struct ImagesResponse {
    images: Vec<ImageEntry>,
}

#[derive(Deserialize)]
struct ImageEntry {
    slug: String,
    os_family: String,
    arch_64bit: bool,
}

#[derive(Serialize)]
struct CreateNodesRequest<'a> {
    group: &'a str,
    count: u32,
    size: &'a str,
    image: &'a str,
    startup_script: &'a str,
    inbound_ports: &'a [u16],
}

#[derive(Deserialize)]
struct CreateNodesResponse {
    nodes: Vec<CreatedNode>,
}

#[derive(Deserialize)]
struct CreatedNode {
    id: String,
    ip: String,
}

#[derive(Deserialize)]
struct ListNodesResponse {
    nodes: Vec<ListedNode>,
}

#[derive(Deserialize)]
struct ListedNode {
    id: String,
    group: String,
}

impl Compute {
    pub fn connect(
        provider_id: &str,
        config: &ProviderCredentials,
    ) -> Result<Compute, CloudstrapError> {
        let endpoint = config.require_override(&format!("{provider_id}.endpoint"))?;
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CloudstrapError::connection(provider_id, e))?;

        Ok(Compute {
            provider_id: provider_id.to_string(),
            identity: config.identity().to_string(),
            credential: config.credential().to_string(),
            base_url: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
    ) -> Result<T, CloudstrapError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .basic_auth(&self.identity, Some(&self.credential))
            .header("accept", "application/json")
            .send()
            .map_err(|e| self.operation_error(operation, format!("request failed: {e}")))?;

        let response = self.check_status(response, operation)?;
        response
            .json()
            .map_err(|e| self.operation_error(operation, format!("failed to parse response: {e}")))
    }

    fn check_status(
        &self,
        response: reqwest::blocking::Response,
        operation: &str,
    ) -> Result<reqwest::blocking::Response, CloudstrapError> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(self.operation_error(operation, format!("API error ({status}): {text}")));
        }
        Ok(response)
    }

    fn operation_error(&self, operation: &str, reason: impl std::fmt::Display) -> CloudstrapError {
        CloudstrapError::operation(&self.provider_id, operation, reason)
    }
}

impl ComputeService for Compute {
    fn build_template(&self, spec: &TemplateSpec) -> Result<Template, CloudstrapError> {
        let catalog: SizesResponse = self.get("sizes", "list sizes")?;
        let size = match spec.size_hint {
            SizeHint::Smallest => catalog
                .sizes
                .into_iter()
                .min_by_key(|s| (s.memory_mb, s.vcpus))
                .ok_or_else(|| {
                    self.operation_error("build template", "provider returned no sizes")
                })?,
        };

        let images: ImagesResponse = self.get("images", "list images")?;
        let image = images
            .images
            .into_iter()
            .find(|i| i.os_family == spec.os_family.as_str() && i.arch_64bit == spec.os_64bit)
            .ok_or_else(|| {
                self.operation_error(
                    "build template",
                    format!(
                        "no {} image matching the requested architecture",
                        spec.os_family.as_str()
                    ),
                )
            })?;

        Ok(Template {
            size: size.slug,
            image: image.slug,
            startup_script: spec.startup_script.clone(),
            inbound_ports: spec.inbound_ports.clone(),
        })
    }

    fn create_nodes(
        &self,
        group: &str,
        count: u32,
        template: &Template,
    ) -> Result<Vec<NodeDetails>, CloudstrapError> {
        let payload = CreateNodesRequest {
            group,
            count,
            size: &template.size,
            image: &template.image,
            startup_script: &template.startup_script,
            inbound_ports: &template.inbound_ports,
        };

        let response = self
            .client
            .post(format!("{}/nodes", self.base_url))
            .basic_auth(&self.identity, Some(&self.credential))
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .map_err(|e| self.operation_error("create nodes", format!("request failed: {e}")))?;

        let response = self.check_status(response, "create nodes")?;
        let created: CreateNodesResponse = response.json().map_err(|e| {
            self.operation_error("create nodes", format!("failed to parse response: {e}"))
        })?;

        Ok(created
            .nodes
            .into_iter()
            .map(|n| NodeDetails { id: n.id, ip: n.ip })
            .collect())
    }

    fn destroy_nodes_in_group(&self, group: &str) -> Result<Vec<String>, CloudstrapError> {
        let listing: ListNodesResponse = self.get("nodes", "list nodes")?;

        let mut destroyed = Vec::new();
        for node in listing.nodes.into_iter().filter(|n| n.group == group) {
            let response = self
                .client
                .delete(format!("{}/nodes/{}", self.base_url, node.id))
                .basic_auth(&self.identity, Some(&self.credential))
                .send()
                .map_err(|e| {
                    self.operation_error("destroy nodes", format!("request failed: {e}"))
                })?;
            self.check_status(response, "destroy nodes")?;
            destroyed.push(node.id);
        }

        Ok(destroyed)
    }
}
