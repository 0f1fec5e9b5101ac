use django_mongodb_cli::presentation::cli::CliApp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging is initialised by the app once --verbose is known
    let app = CliApp::new();
    app.run().await
}
