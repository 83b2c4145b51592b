#[tokio::main]
async fn main() {
    if let Err(err) = club_enrollment::run().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}
