use std::sync::Arc;
use std::time::Duration;

use bedrock_relay::{
    AdmissionQueue, AppState, Env, HttpDispatcher, MistralBedrockTranslator, Pipeline, RelayConfig,
    SigV4Signer, resolve_credentials, router,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: bedrock-relay [config.json] [--listen HOST:PORT] [--region REGION] \
[--endpoint URL] [--max-in-flight N] [--queue-wait-secs SECS]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = RelayConfig::default();
    let mut endpoint: Option<String> = None;

    let mut args = std::env::args().skip(1).peekable();
    if let Some(first) = args.peek() {
        if !first.starts_with("--") {
            config = RelayConfig::load(first)?;
            args.next();
        }
    }
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--listen" | "--addr" => {
                config.listen = args.next().ok_or("missing value for --listen/--addr")?;
            }
            "--region" => {
                config.region = args.next().ok_or("missing value for --region")?;
            }
            "--endpoint" => {
                endpoint = Some(args.next().ok_or("missing value for --endpoint")?);
            }
            "--max-in-flight" => {
                let raw = args.next().ok_or("missing value for --max-in-flight")?;
                config.max_in_flight = raw.parse().map_err(|_| "invalid --max-in-flight")?;
            }
            "--queue-wait-secs" => {
                let raw = args.next().ok_or("missing value for --queue-wait-secs")?;
                config.queue_wait_secs = raw.parse().map_err(|_| "invalid --queue-wait-secs")?;
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument {other:?}\n{USAGE}").into());
            }
        }
    }

    let credentials = resolve_credentials(&Env::from_process())?;
    let signer = SigV4Signer::new(credentials, config.region.clone(), "bedrock")?;

    let mut translator = MistralBedrockTranslator::new(&config.region);
    if let Some(endpoint) = endpoint {
        translator = translator.with_endpoint(endpoint);
    }

    let queue = AdmissionQueue::new(
        config.max_in_flight,
        Duration::from_secs(config.queue_wait_secs),
    );
    let pipeline = Pipeline::new(
        MistralBedrockTranslator::CAPABILITY,
        translator,
        signer,
        queue,
        Arc::new(HttpDispatcher::new()?),
    )?;

    let app = router(AppState::new(pipeline));
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(listen = %config.listen, region = %config.region, "bedrock-relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
