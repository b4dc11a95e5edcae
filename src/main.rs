#[tokio::main]
async fn main() {
    // Bind failure is the only fatal error; it is already logged by the framework layer.
    if flappy_hub::run_with_config().await.is_err() {
        std::process::exit(1);
    }
}
