pub mod config;
pub mod error;

use error::CloudstrapError;
use serde::{Deserialize, Serialize};

/// A connection to a compute provider, able to build deployable templates
/// and manage groups of nodes. Connections release their resources on drop,
/// including on early-error paths.
pub trait ComputeService {
    fn build_template(&self, spec: &TemplateSpec) -> Result<Template, CloudstrapError>;

    fn create_nodes(
        &self,
        group: &str,
        count: u32,
        template: &Template,
    ) -> Result<Vec<NodeDetails>, CloudstrapError>;

    /// Destroys every node tagged with the given group, returning the ids
    /// of the nodes that were destroyed.
    fn destroy_nodes_in_group(&self, group: &str) -> Result<Vec<String>, CloudstrapError>;
}

/// A connection to a configuration-management server holding bootstrap
/// profiles, registered agents/nodes, and named data collections.
pub trait ConfigMgmtService {
    fn update_bootstrap_profile(
        &self,
        group: &str,
        profile: &BootstrapProfile,
    ) -> Result<(), CloudstrapError>;

    /// Renders the bootstrap script that enrolls a new node of the group
    /// with the server.
    fn bootstrap_script(&self, group: &str) -> Result<String, CloudstrapError>;

    fn list_agents(&self) -> Result<Vec<String>, CloudstrapError>;

    fn list_registered_nodes(&self) -> Result<Vec<String>, CloudstrapError>;

    fn delete_agents(&self, names: &[String]) -> Result<(), CloudstrapError>;

    fn delete_registered_nodes(&self, names: &[String]) -> Result<(), CloudstrapError>;

    fn delete_data_collection(&self, name: &str) -> Result<(), CloudstrapError>;
}

#[derive(Debug, Clone)]
pub struct NodeDetails {
    pub id: String,
    pub ip: String,
}

/// Hardware/OS selection criteria plus the startup script and firewall
/// openings a node group needs. Resolved into a concrete [`Template`] by the
/// compute provider.
#[derive(Debug, Clone)]
pub struct TemplateSpec {
    pub size_hint: SizeHint,
    pub os_family: OsFamily,
    pub os_64bit: bool,
    pub startup_script: String,
    pub inbound_ports: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeHint {
    Smallest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Debian,
    Ubuntu,
    Centos,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Debian => "debian",
            OsFamily::Ubuntu => "ubuntu",
            OsFamily::Centos => "centos",
        }
    }
}

/// A deployable template: a resolved hardware size and image, carrying the
/// startup script and inbound ports from the spec that produced it.
#[derive(Debug, Clone)]
pub struct Template {
    pub size: String,
    pub image: String,
    pub startup_script: String,
    pub inbound_ports: Vec<u16>,
}

/// Settings applied to new nodes of a group before their rendered startup
/// script runs: the environment they join, the run list they converge, and
/// the TLS verification policy used while enrolling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapProfile {
    pub environment: String,
    pub run_list: Vec<String>,
    pub ssl_verify_mode: SslVerifyMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SslVerifyMode {
    None,
    Peer,
}
