pub mod action_resolver;
pub mod reconciler;
pub mod registry_bridge;
pub mod snapshot_fetcher;
