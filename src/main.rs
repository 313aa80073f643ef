#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = gradeglide_review::run().await {
        eprintln!("gradeglide-review fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
