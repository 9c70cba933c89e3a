#[tokio::main]
async fn main() -> std::io::Result<()> {
    atc_server::run_with_config().await
}
