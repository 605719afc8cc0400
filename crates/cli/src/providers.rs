use cloudstrap_compute::Compute;
use cloudstrap_core::config::ProviderCredentials;
use cloudstrap_core::error::CloudstrapError;
use cloudstrap_core::ComputeService;

/// Opens a compute connection for the named provider. Every provider goes
/// through the generic REST client; its `.endpoint` override selects the
/// target API.
pub fn open_compute(
    provider: &str,
    config: &ProviderCredentials,
) -> Result<Box<dyn ComputeService>, CloudstrapError> {
    let handle = Compute::connect(provider, config)?;
    Ok(Box::new(handle))
}
