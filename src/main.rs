#[tokio::main]
async fn main() {
    if let Err(e) = clinic_lib::run().await {
        eprintln!("clinic: {e}");
        std::process::exit(1);
    }
}
