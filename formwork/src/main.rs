use formwork::SiteConf;

#[tokio::main]
async fn main() {
    let conf = SiteConf::from_env();
    if let Err(err) = formwork::run(conf).await {
        tracing::error!(error = %err, "formwork exited with an error");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
