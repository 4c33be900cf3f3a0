#[tokio::main]
async fn main() {
    cryptostats::utils::init_tracing();
    cryptostats::cli::run().await;
}
