use cloudstrap_chef::ChefServer;
use cloudstrap_core::config::{ConfigDir, ProviderCredentials};
use cloudstrap_core::error::CloudstrapError;
use cloudstrap_core::{
    BootstrapProfile, ConfigMgmtService, OsFamily, SizeHint, SslVerifyMode, TemplateSpec,
};

use crate::providers;
use crate::spinner;

const GROUP_PREFIX: &str = "demo";
const ENVIRONMENT: &str = "cloudstrap-demo";
const INBOUND_PORTS: [u16; 3] = [22, 80, 22002];

pub fn handle_up(provider: String, role: String, count: u32) -> Result<(), CloudstrapError> {
    let spinner = spinner::create_spinner();
    let config_dir = ConfigDir::default_location();

    spinner.set_message("Loading provider configuration...");
    let compute_config = ProviderCredentials::load(&provider, &config_dir)?;
    let chef_config = ProviderCredentials::load("chef", &config_dir)?;

    spinner.set_message(format!("Connecting to {}...", provider));
    let compute = providers::open_compute(&provider, &compute_config)?;
    let chef = ChefServer::connect(&chef_config)?;

    let group = format!("{}-{}", GROUP_PREFIX, role);

    // Push the group's bootstrap settings, then render the enrollment
    // script the new nodes will run on first boot.
    spinner.set_message("Generating bootstrap configuration...");
    let profile = BootstrapProfile {
        environment: ENVIRONMENT.to_string(),
        run_list: vec![format!("role[{}]", role)],
        ssl_verify_mode: SslVerifyMode::None,
    };
    chef.update_bootstrap_profile(&group, &profile)?;
    let enroll_script = chef.bootstrap_script(&group)?;

    // Admin user setup runs before the enrollment script.
    let startup_script = format!("{}\n{}", admin_access_script(), enroll_script);

    spinner.set_message("Selecting image and hardware profile...");
    let template = compute.build_template(&TemplateSpec {
        size_hint: SizeHint::Smallest,
        os_family: OsFamily::Debian,
        os_64bit: true,
        startup_script,
        inbound_ports: INBOUND_PORTS.to_vec(),
    })?;

    spinner.set_message(format!("Creating {} node(s) in group '{}'...", count, group));
    let nodes = compute.create_nodes(&group, count, &template)?;

    spinner.finish_with_message(format!(
        "Created {} node(s) in group '{}'",
        nodes.len(),
        group
    ));
    for node in &nodes {
        println!("{}  {}", node.id, node.ip);
    }

    Ok(())
}

/// Creates a passwordless-sudo admin user so the nodes stay reachable for
/// debugging if the enrollment script fails partway.
fn admin_access_script() -> String {
    [
        "#!/bin/sh",
        "useradd --create-home --shell /bin/bash admin",
        "echo 'admin ALL=(ALL) NOPASSWD:ALL' > /etc/sudoers.d/admin",
        "chmod 0440 /etc/sudoers.d/admin",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_script_runs_admin_setup_first() {
        let script = admin_access_script();
        assert!(script.starts_with("#!/bin/sh"));
        assert!(script.contains("useradd"));
    }
}
