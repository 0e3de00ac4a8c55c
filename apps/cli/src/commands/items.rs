use anyhow::{Context, Result};

use hupload_share_client::Client;

use crate::config::CliConfig;
use crate::render;

pub async fn execute(config: &CliConfig, share: &str) -> Result<()> {
    let client = Client::new(config.client_config()).context("failed to create client")?;
    let items = client
        .list_items(share)
        .await
        .with_context(|| format!("failed to list share {share}"))?;

    if items.is_empty() {
        println!("share {share} is empty");
        return Ok(());
    }

    let total: u64 = items.iter().map(|i| i.size()).sum();
    for item in &items {
        println!("{}", render::item_line(item));
    }
    println!(
        "{} items, {}",
        items.len(),
        render::human_file_size(total)
    );
    Ok(())
}
