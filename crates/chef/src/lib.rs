use cloudstrap_core::config::ProviderCredentials;
use cloudstrap_core::error::CloudstrapError;
use cloudstrap_core::{BootstrapProfile, ConfigMgmtService};

const SERVICE: &str = "chef";

/// Blocking REST connection to a Chef-style configuration-management
/// server. The server endpoint comes from the `chef.endpoint` override;
/// the identity is the API client name and the credential is the contents
/// of its key file, sent as HTTP basic auth.
///
/// Dropping the connection releases it.
#[derive(Debug)]
pub struct ChefServer {
    identity: String,
    credential: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ChefServer {
    pub fn connect(config: &ProviderCredentials) -> Result<ChefServer, CloudstrapError> {
        let endpoint = config.require_override("chef.endpoint")?;
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CloudstrapError::connection(SERVICE, e))?;

        Ok(ChefServer {
            identity: config.identity().to_string(),
            credential: config.credential().to_string(),
            base_url: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn list_names(&self, path: &str, operation: &str) -> Result<Vec<String>, CloudstrapError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .basic_auth(&self.identity, Some(&self.credential))
            .header("accept", "application/json")
            .send()
            .map_err(|e| CloudstrapError::operation(SERVICE, operation, format!("request failed: {e}")))?;

        let response = check_status(response, operation)?;
        response.json().map_err(|e| {
            CloudstrapError::operation(SERVICE, operation, format!("failed to parse response: {e}"))
        })
    }

    fn delete_each(
        &self,
        path: &str,
        names: &[String],
        operation: &str,
    ) -> Result<(), CloudstrapError> {
        for name in names {
            let response = self
                .client
                .delete(format!("{}/{}/{}", self.base_url, path, name))
                .basic_auth(&self.identity, Some(&self.credential))
                .send()
                .map_err(|e| {
                    CloudstrapError::operation(SERVICE, operation, format!("request failed: {e}"))
                })?;
            check_status(response, operation)?;
        }
        Ok(())
    }
}

impl ConfigMgmtService for ChefServer {
    fn update_bootstrap_profile(
        &self,
        group: &str,
        profile: &BootstrapProfile,
    ) -> Result<(), CloudstrapError> {
        let operation = "update bootstrap profile";
        let response = self
            .client
            .put(format!("{}/bootstrap/{}", self.base_url, group))
            .basic_auth(&self.identity, Some(&self.credential))
            .json(profile)
            .send()
            .map_err(|e| {
                CloudstrapError::operation(SERVICE, operation, format!("request failed: {e}"))
            })?;
        check_status(response, operation)?;
        Ok(())
    }

    fn bootstrap_script(&self, group: &str) -> Result<String, CloudstrapError> {
        let operation = "render bootstrap script";
        let response = self
            .client
            .get(format!("{}/bootstrap/{}/script", self.base_url, group))
            .basic_auth(&self.identity, Some(&self.credential))
            .send()
            .map_err(|e| {
                CloudstrapError::operation(SERVICE, operation, format!("request failed: {e}"))
            })?;
        let response = check_status(response, operation)?;
        response.text().map_err(|e| {
            CloudstrapError::operation(SERVICE, operation, format!("failed to read response: {e}"))
        })
    }

    fn list_agents(&self) -> Result<Vec<String>, CloudstrapError> {
        self.list_names("clients", "list agents")
    }

    fn list_registered_nodes(&self) -> Result<Vec<String>, CloudstrapError> {
        self.list_names("nodes", "list registered nodes")
    }

    fn delete_agents(&self, names: &[String]) -> Result<(), CloudstrapError> {
        self.delete_each("clients", names, "delete agents")
    }

    fn delete_registered_nodes(&self, names: &[String]) -> Result<(), CloudstrapError> {
        self.delete_each("nodes", names, "delete registered nodes")
    }

    fn delete_data_collection(&self, name: &str) -> Result<(), CloudstrapError> {
        let operation = "delete data collection";
        let response = self
            .client
            .delete(format!("{}/data/{}", self.base_url, name))
            .basic_auth(&self.identity, Some(&self.credential))
            .send()
            .map_err(|e| {
                CloudstrapError::operation(SERVICE, operation, format!("request failed: {e}"))
            })?;
        check_status(response, operation)?;
        Ok(())
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    operation: &str,
) -> Result<reqwest::blocking::Response, CloudstrapError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().unwrap_or_default();
        return Err(CloudstrapError::operation(
            SERVICE,
            operation,
            format!("API error ({status}): {text}"),
        ));
    }
    Ok(response)
}
