//! CLI command implementations.
//!
//! Every command returns what it printed so it can be checked in tests.

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod patch;
pub mod update;

#[cfg(test)]
pub(crate) fn mock_registry() -> (hub_client::HubRegistry, hub_client::MockTransport) {
    let transport = hub_client::MockTransport::new();
    let registry = hub_client::HubRegistry::new(
        hub_client::HubConfig::default().with_base_url("http://api.test"),
        transport.clone(),
    );
    registry.register::<crate::product::Product>();
    (registry, transport)
}
