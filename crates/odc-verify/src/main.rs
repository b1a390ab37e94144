use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use odc_schema::PactWriteMode;
use odc_shipping::{ShippingServer, DEFAULT_PORT};
use odc_verify::contracts;
use odc_verify::{init_tracing, AppConfig, CaptureOrder, LogFormat, ShippingProviderVerifier};

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let format = matches
        .get_one::<String>("log-format")
        .and_then(|f| f.parse::<LogFormat>().ok())
        .unwrap_or_default();
    init_tracing(format);

    let code = match run(&matches).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn cli() -> Command {
    Command::new("odc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Contract verification for the OpenTelemetry demo")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("compact")
                .value_parser(PossibleValuesParser::new(["compact", "json"]))
                .help("Log output format"),
        )
        .subcommand(
            Command::new("verify-checkout")
                .about("Verify the order message checkout publishes for accounting")
                .arg(Arg::new("namespace").long("namespace").help("Kubernetes namespace"))
                .arg(Arg::new("deployment").long("deployment").help("Deployment to scale down"))
                .arg(Arg::new("frontend-url").long("frontend-url").help("Storefront base URL"))
                .arg(Arg::new("checkout-api-url").long("checkout-api-url").help("Checkout endpoint"))
                .arg(Arg::new("broker").long("broker").help("Kafka bootstrap servers"))
                .arg(Arg::new("topic").long("topic").help("Orders topic"))
                .arg(
                    Arg::new("timeout-ms")
                        .long("timeout-ms")
                        .value_parser(value_parser!(u64))
                        .help("Message capture timeout in milliseconds"),
                )
                .arg(
                    Arg::new("max-poll-attempts")
                        .long("max-poll-attempts")
                        .value_parser(value_parser!(u32))
                        .help("Give up waiting on replicas after this many polls"),
                )
                .arg(
                    Arg::new("capture-order")
                        .long("capture-order")
                        .value_parser(PossibleValuesParser::new(["subscribe-first", "trigger-first"]))
                        .help("Open the subscription before or after the trigger"),
                )
                .arg(
                    Arg::new("pact-file")
                        .long("pact-file")
                        .value_parser(value_parser!(PathBuf))
                        .help("Pact file describing the order message"),
                ),
        )
        .subcommand(
            Command::new("verify-shipping")
                .about("Verify a running shipping service against the frontend's pacts")
                .arg(Arg::new("provider-url").long("provider-url").help("Shipping service base URL"))
                .arg(
                    Arg::new("pact-dir")
                        .long("pact-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding *shipping.json pacts"),
                ),
        )
        .subcommand(
            Command::new("mock-shipping")
                .about("Run the mock shipping service until interrupted")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .default_value("0.0.0.0")
                        .value_parser(value_parser!(IpAddr))
                        .help("Address to listen on"),
                )
                .arg(
                    Arg::new("port")
                        .long("port")
                        .default_value("9001")
                        .value_parser(value_parser!(u16))
                        .help("Port to listen on"),
                ),
        )
        .subcommand(
            Command::new("write-pacts")
                .about("Write the consumer contracts")
                .arg(
                    Arg::new("pact-dir")
                        .long("pact-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output directory"),
                )
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .action(ArgAction::SetTrue)
                        .help("Replace existing files instead of merging"),
                ),
        )
}

async fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config_path = matches.get_one::<PathBuf>("config");
    let mut config = AppConfig::load(config_path.map(PathBuf::as_path)).context("loading configuration")?;

    match matches.subcommand() {
        Some(("verify-checkout", args)) => verify_checkout(&mut config, args).await,
        Some(("verify-shipping", args)) => {
            if let Some(url) = args.get_one::<String>("provider-url") {
                config.shipping.provider_url.clone_from(url);
            }
            if let Some(dir) = args.get_one::<PathBuf>("pact-dir") {
                config.pact_dir.clone_from(dir);
            }
            config.validate()?;

            let verifier = ShippingProviderVerifier::from_config(&config)?;
            match verifier.verify().await {
                Ok(report) => {
                    println!("{}", report.summary());
                    Ok(report.exit_code())
                }
                Err(e) => {
                    tracing::error!("Provider verification could not run: {}", e);
                    Ok(1)
                }
            }
        }
        Some(("mock-shipping", args)) => {
            let host = args
                .get_one::<IpAddr>("host")
                .copied()
                .unwrap_or(IpAddr::from([0, 0, 0, 0]));
            let port = args.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT);

            let server = ShippingServer::bind(SocketAddr::new(host, port))
                .with_context(|| format!("binding {host}:{port}"))?;
            tracing::info!("Mock shipping service listening on {}", server.local_addr());

            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            tracing::info!("Shutting down mock shipping service");
            server.shutdown().await;
            Ok(0)
        }
        Some(("write-pacts", args)) => {
            let dir = args.get_one::<PathBuf>("pact-dir").unwrap_or(&config.pact_dir);
            let mode = if args.get_flag("overwrite") {
                PactWriteMode::Overwrite
            } else {
                PactWriteMode::Merge
            };
            for path in contracts::write_all(dir, mode)? {
                println!("{}", path.display());
            }
            Ok(0)
        }
        _ => Ok(0),
    }
}

async fn verify_checkout(config: &mut AppConfig, args: &ArgMatches) -> anyhow::Result<i32> {
    let checkout = &mut config.checkout;
    let overrides = [
        ("namespace", &mut checkout.namespace),
        ("deployment", &mut checkout.deployment),
        ("frontend-url", &mut checkout.frontend_url),
        ("checkout-api-url", &mut checkout.checkout_api_url),
        ("broker", &mut checkout.kafka_broker),
        ("topic", &mut checkout.kafka_topic),
    ];
    for (flag, field) in overrides {
        if let Some(value) = args.get_one::<String>(flag) {
            field.clone_from(value);
        }
    }
    if let Some(ms) = args.get_one::<u64>("timeout-ms") {
        checkout.capture_timeout_ms = *ms;
    }
    if let Some(max) = args.get_one::<u32>("max-poll-attempts") {
        checkout.max_poll_attempts = Some(*max);
    }
    match args.get_one::<String>("capture-order").map(String::as_str) {
        Some("trigger-first") => checkout.capture_order = CaptureOrder::TriggerFirst,
        Some("subscribe-first") => checkout.capture_order = CaptureOrder::SubscribeFirst,
        _ => {}
    }
    if let Some(path) = args.get_one::<PathBuf>("pact-file") {
        checkout.pact_file = Some(path.clone());
    } else if checkout.pact_file.is_none() {
        let default = config.pact_dir.join("accounting-checkout.json");
        if default.is_file() {
            config.checkout.pact_file = Some(default);
        }
    }
    config.validate()?;

    run_checkout(config).await
}

#[cfg(feature = "kafka")]
async fn run_checkout(config: &AppConfig) -> anyhow::Result<i32> {
    let flow = odc_verify::CheckoutFlow::from_config(&config.checkout)?;
    tracing::info!("Starting {:?}", flow);
    let report = flow.run().await;
    println!("{}", report.summary());
    Ok(report.exit_code())
}

#[cfg(not(feature = "kafka"))]
async fn run_checkout(_config: &AppConfig) -> anyhow::Result<i32> {
    anyhow::bail!("verify-checkout needs the `kafka` feature")
}
