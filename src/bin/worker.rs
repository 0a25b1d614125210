#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizforge::run_worker().await {
        eprintln!("quizforge-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
