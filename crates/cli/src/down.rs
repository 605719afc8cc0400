use cloudstrap_chef::ChefServer;
use cloudstrap_core::config::{ConfigDir, ProviderCredentials};
use cloudstrap_core::error::CloudstrapError;
use cloudstrap_core::ConfigMgmtService;

use crate::providers;
use crate::spinner;

pub fn handle_down(provider: String, prefix: String) -> Result<(), CloudstrapError> {
    let spinner = spinner::create_spinner();
    let config_dir = ConfigDir::default_location();

    spinner.set_message("Loading provider configuration...");
    let compute_config = ProviderCredentials::load(&provider, &config_dir)?;
    let chef_config = ProviderCredentials::load("chef", &config_dir)?;

    spinner.set_message(format!("Connecting to {}...", provider));
    let compute = providers::open_compute(&provider, &compute_config)?;
    let chef = ChefServer::connect(&chef_config)?;

    for group in [
        format!("{}-webserver", prefix),
        format!("{}-load-balancer", prefix),
    ] {
        spinner.set_message(format!("Destroying nodes in group '{}'...", group));
        let destroyed = compute.destroy_nodes_in_group(&group)?;
        if !destroyed.is_empty() {
            spinner.println(format!(
                "Destroyed {} node(s) in group '{}'",
                destroyed.len(),
                group
            ));
        }
    }

    spinner.set_message("Cleaning up configuration-management records...");
    let agents = with_prefix(chef.list_agents()?, &prefix);
    chef.delete_agents(&agents)?;
    let registered = with_prefix(chef.list_registered_nodes()?, &prefix);
    chef.delete_registered_nodes(&registered)?;
    chef.delete_data_collection("bootstrap")?;

    spinner.finish_with_message("Teardown complete");
    Ok(())
}

fn with_prefix(names: Vec<String>, prefix: &str) -> Vec<String> {
    names.into_iter().filter(|n| n.starts_with(prefix)).collect()
}
