use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    wikitrans_cli::main_entry().await
}
