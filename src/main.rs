use kvdesk::settings::{self, AppSettings};
use kvdesk::workspace::ChannelConfirm;
use kvdesk::{Shell, Workspace, WorkspaceOptions};
use kvdesk_core::client::HttpStore;

use anyhow::Result;
use std::sync::Arc;
use tokio::io::BufReader;

async fn restore_active(workspace: &Workspace, settings: &AppSettings) {
    let Some(id) = settings.last_active_connection.as_deref() else {
        return;
    };
    if let Err(e) = workspace.restore_active(id).await {
        log::warn!("Failed to restore active connection {}: {}", id, e);
    }
}

async fn run(settings: AppSettings) -> Result<AppSettings> {
    let store = Arc::new(HttpStore::new(
        settings.api_base_url.clone(),
        settings.request_timeout(),
    ));
    let (confirm, confirmations) = ChannelConfirm::new();
    let workspace = Arc::new(Workspace::new(
        store,
        Arc::new(confirm),
        WorkspaceOptions::from(&settings),
    ));

    match workspace.refresh_connections().await {
        Ok(connections) => log::info!("Loaded {} connection(s)", connections.len()),
        Err(e) => log::warn!("Failed to list connections from {}: {}", settings.api_base_url, e),
    }
    restore_active(&workspace, &settings).await;

    let shell = Shell::new(workspace.clone(), confirmations);
    let mut stdout = tokio::io::stdout();
    shell
        .run(BufReader::new(tokio::io::stdin()), &mut stdout)
        .await?;

    Ok(AppSettings {
        last_active_connection: workspace.registry().active_id(),
        ..settings
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let settings = settings::load_settings().with_env_overrides();
    log::info!("Using management API at {}", settings.api_base_url);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    let settings = runtime.block_on(run(settings))?;
    if let Err(e) = settings::save_settings(&settings) {
        log::warn!("Failed to save settings: {}", e);
    }
    Ok(())
}
