//! Interactive choice of which saved network to forget.

use async_trait::async_trait;
use dialoguer::Select;
use jetclock_netmode::NetworkSelector;

/// Asks the operator on the terminal. Escape or `q` cancels.
pub struct PromptSelector;

#[async_trait]
impl NetworkSelector for PromptSelector {
    async fn select(&self, networks: &[String]) -> Option<String> {
        let items = networks.to_vec();

        let choice = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt("Network to forget")
                .items(&items)
                .default(0)
                .interact_opt()
                .map(|picked| picked.and_then(|i| items.get(i).cloned()))
        })
        .await;

        match choice {
            Ok(Ok(picked)) => picked,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "network prompt failed");
                None
            }
            Err(e) => {
                tracing::error!("network prompt task failed: {}", e);
                None
            }
        }
    }
}
