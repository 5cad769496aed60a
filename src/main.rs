#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pixel_pages_lib::run().await
}
