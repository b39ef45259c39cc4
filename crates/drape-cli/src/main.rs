mod server;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use drape_contracts::events::{EventPayload, EventWriter};
use drape_contracts::{CustomizationState, CustomizationStore, DecalKind, HexColor};
use drape_engine::config::{backend_url_from_env, non_empty_env};
use drape_engine::{
    AcquisitionConfig, BackendClient, CustomizationSession, ExportSummary, FileIngestService,
    ImageAcquisitionService, IngestLimits, PromptSource,
};
use serde_json::Value;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Parser)]
#[command(name = "drape", version, about = "Garment decal customizer service and session tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the image generation API.
    Serve(ServeArgs),
    /// Generate one image from a prompt and write it to disk.
    Generate(GenerateArgs),
    /// Run a scripted customization session and export the result.
    Customize(CustomizeArgs),
}

#[derive(Debug, Parser)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,
    /// Defaults to $PORT, then 8080.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct CustomizeArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    color: Option<HexColor>,
    #[arg(long)]
    logo_file: Option<PathBuf>,
    #[arg(long)]
    full_file: Option<PathBuf>,
    #[arg(long)]
    logo_prompt: Option<String>,
    #[arg(long)]
    full_prompt: Option<String>,
    /// Filter tab to toggle after decals are applied; repeatable.
    #[arg(long = "toggle")]
    toggles: Vec<String>,
    /// Generate through a running drape server instead of calling providers directly.
    #[arg(long)]
    remote: bool,
    /// Backend URL for --remote; defaults to $DRAPE_BACKEND_URL.
    #[arg(long)]
    backend_url: Option<String>,
    /// Skip upload size and type checks.
    #[arg(long)]
    unrestricted: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("drape error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_serve(args),
        Command::Generate(args) => run_generate(args),
        Command::Customize(args) => run_customize(args),
    }
}

fn run_serve(args: ServeArgs) -> Result<i32> {
    let port = match args.port {
        Some(port) => port,
        None => match non_empty_env("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT is not a valid port number ({raw})"))?,
            None => DEFAULT_PORT,
        },
    };
    let config = AcquisitionConfig::from_env();
    // Blocking HTTP clients must be created and dropped outside the runtime.
    let service = ImageAcquisitionService::from_config(&config)?;
    let [primary, fallback] = service.provider_names();
    tracing::info!(
        primary,
        primary_base = %config.primary_api_base,
        fallback,
        fallback_base = %config.fallback_api_base,
        size = config.image_size,
        "image providers configured"
    );
    let service: Arc<dyn PromptSource> = Arc::new(service);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(server::serve(
        SocketAddr::new(args.host, port),
        Arc::clone(&service),
    ))?;
    drop(runtime);
    Ok(0)
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let service = ImageAcquisitionService::from_config(&AcquisitionConfig::from_env())?;
    let image = service.generate(&args.prompt)?;
    let bytes = BASE64
        .decode(&image.base64)
        .context("provider returned invalid base64")?;
    if let Some(parent) = args.out.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    println!(
        "wrote {} ({} bytes, via {})",
        args.out.display(),
        bytes.len(),
        image.provider
    );
    Ok(0)
}

struct SessionReport {
    session_id: String,
    snapshot: CustomizationState,
    summary: ExportSummary,
}

fn run_customize(args: CustomizeArgs) -> Result<i32> {
    let config = AcquisitionConfig::from_env();
    let source: Arc<dyn PromptSource> = if args.remote {
        let url = args.backend_url.clone().unwrap_or_else(backend_url_from_env);
        tracing::info!(url = %url, "generating through remote backend");
        Arc::new(BackendClient::new(url, config.timeout)?)
    } else {
        Arc::new(ImageAcquisitionService::from_config(&config)?)
    };

    let report = run_session(&args, source)?;
    let snapshot = &report.snapshot;
    println!("session {}", report.session_id);
    println!(
        "color {} (text {})",
        snapshot.base_color,
        snapshot.base_color.contrasting()
    );
    println!(
        "textures logo={} full={}",
        snapshot.logo_texture_enabled, snapshot.full_texture_enabled
    );
    println!("state {}", report.summary.state_path.display());
    for path in &report.summary.decal_paths {
        println!("decal {}", path.display());
    }
    Ok(0)
}

fn run_session(args: &CustomizeArgs, source: Arc<dyn PromptSource>) -> Result<SessionReport> {
    let limits = if args.unrestricted {
        IngestLimits::unrestricted()
    } else {
        IngestLimits::default()
    };

    let store = CustomizationStore::default();
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(&events_path, uuid::Uuid::new_v4().to_string());
    let mut started = EventPayload::new();
    started.insert(
        "out_dir".to_string(),
        Value::String(args.out.display().to_string()),
    );
    events.emit("session_started", started)?;
    events.attach(&store);

    let session = CustomizationSession::new(store, source, FileIngestService::new(limits));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(apply_customizations(&session, args))?;
    drop(runtime);

    let summary = session.export(&args.out)?;
    let mut finished = EventPayload::new();
    finished.insert(
        "state_path".to_string(),
        Value::String(summary.state_path.display().to_string()),
    );
    finished.insert(
        "decals".to_string(),
        Value::from(
            summary
                .decal_paths
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>(),
        ),
    );
    events.emit("session_finished", finished)?;

    Ok(SessionReport {
        session_id: events.session_id().to_string(),
        snapshot: session.store().snapshot(),
        summary,
    })
}

async fn apply_customizations(session: &CustomizationSession, args: &CustomizeArgs) -> Result<()> {
    if session.store().snapshot().intro_mode {
        session.toggle_intro();
    }
    if let Some(color) = args.color {
        session.set_color(color);
    }

    let files = [
        (DecalKind::Logo, args.logo_file.as_ref()),
        (DecalKind::Full, args.full_file.as_ref()),
    ];
    for (kind, path) in files
        .into_iter()
        .filter_map(|(kind, path)| Some((kind, path?)))
    {
        session
            .apply_file(kind, path)
            .await
            .with_context(|| format!("failed to apply {kind} decal from {}", path.display()))?;
    }

    let prompts = [
        (DecalKind::Logo, args.logo_prompt.as_deref()),
        (DecalKind::Full, args.full_prompt.as_deref()),
    ];
    for (kind, prompt) in prompts
        .into_iter()
        .filter_map(|(kind, prompt)| Some((kind, prompt?)))
    {
        let assignment = session
            .apply_prompt(kind, prompt)
            .await
            .with_context(|| format!("failed to generate {kind} decal"))?;
        tracing::info!(kind = %kind, bytes = assignment.payload.len(), "decal generated");
    }

    for tab in &args.toggles {
        let filters = session.toggle_filter(tab);
        tracing::info!(tab = %tab, logo = filters.logo, full = filters.full, "filter toggled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use base64::Engine as _;
    use clap::Parser;
    use drape_engine::{AcquisitionError, EncodedImage, PromptSource};
    use serde_json::Value;

    use super::{run_session, Cli, Command, CustomizeArgs, BASE64};

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFFjpegbytes";

    struct FixedSource {
        calls: AtomicUsize,
    }

    impl PromptSource for FixedSource {
        fn acquire(&self, prompt: &str) -> Result<EncodedImage, AcquisitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(prompt, "a cool dragon");
            Ok(EncodedImage {
                base64: BASE64.encode(JPEG_MAGIC),
                mime_type: Some("image/jpeg".to_string()),
                provider: "fixed".to_string(),
            })
        }
    }

    fn customize_args(argv: &[&str]) -> CustomizeArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Customize(args) = cli.command else {
            panic!("expected customize command");
        };
        args
    }

    #[test]
    fn customize_args_parse_color_and_repeated_toggles() {
        let cli = Cli::try_parse_from([
            "drape",
            "customize",
            "--out",
            "out",
            "--color",
            "#ff5733",
            "--toggle",
            "logoShirt",
            "--toggle",
            "stylishShirt",
        ])
        .unwrap();
        let Command::Customize(args) = cli.command else {
            panic!("expected customize command");
        };
        assert_eq!(args.color.map(|color| color.to_string()).as_deref(), Some("#FF5733"));
        assert_eq!(args.toggles, vec!["logoShirt", "stylishShirt"]);
        assert!(!args.remote);
    }

    #[test]
    fn customize_rejects_malformed_color() {
        assert!(Cli::try_parse_from(["drape", "customize", "--out", "out", "--color", "blue"]).is_err());
    }

    #[test]
    fn serve_port_is_optional() {
        let cli = Cli::try_parse_from(["drape", "serve", "--port", "9090"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.port, Some(9090));
        assert_eq!(args.host.to_string(), "0.0.0.0");
    }

    #[test]
    fn customize_session_exports_state_decals_and_event_log() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let logo_path = temp.path().join("upload.png");
        fs::write(&logo_path, PNG_MAGIC)?;
        let out = temp.path().join("out");
        let logo_arg = logo_path.display().to_string();
        let out_arg = out.display().to_string();
        let args = customize_args(&[
            "drape",
            "customize",
            "--out",
            &out_arg,
            "--color",
            "#ff5733",
            "--logo-file",
            &logo_arg,
            "--full-prompt",
            "  a cool dragon ",
            "--toggle",
            "stylishShirt",
        ]);
        let source = Arc::new(FixedSource {
            calls: AtomicUsize::new(0),
        });

        let report = run_session(&args, source.clone())?;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let snapshot = &report.snapshot;
        assert!(!snapshot.intro_mode);
        assert_eq!(snapshot.base_color.to_string(), "#FF5733");
        assert!(snapshot.logo_texture_enabled);
        // full was enabled by the prompt and then toggled back off
        assert!(!snapshot.full_texture_enabled);

        assert_eq!(report.summary.state_path, out.join("customization.json"));
        let exported: Value = serde_json::from_slice(&fs::read(&report.summary.state_path)?)?;
        assert_eq!(exported["baseColor"], "#FF5733");
        assert_eq!(
            report.summary.decal_paths,
            vec![out.join("logo.png"), out.join("full.jpg")]
        );
        assert_eq!(fs::read(out.join("logo.png"))?, PNG_MAGIC);
        assert_eq!(fs::read(out.join("full.jpg"))?, JPEG_MAGIC);

        let lines = fs::read_to_string(out.join("events.jsonl"))?;
        let events: Vec<Value> = lines
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        let types: Vec<&str> = events
            .iter()
            .filter_map(|event| event["type"].as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "session_started",
                "intro_toggled",
                "color_changed",
                "decal_changed",
                "decal_changed",
                "filter_changed",
                "filter_changed",
                "session_finished",
            ]
        );
        assert!(events
            .iter()
            .all(|event| event["session_id"] == Value::String(report.session_id.clone())));
        Ok(())
    }

    #[test]
    fn customize_session_rejects_unsupported_upload_without_touching_state() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let upload = temp.path().join("notes.txt");
        fs::write(&upload, b"plain text")?;
        let out = temp.path().join("out");
        let upload_arg = upload.display().to_string();
        let out_arg = out.display().to_string();
        let args = customize_args(&["drape", "customize", "--out", &out_arg, "--full-file", &upload_arg]);
        let source = Arc::new(FixedSource {
            calls: AtomicUsize::new(0),
        });

        let err = match run_session(&args, source.clone()) {
            Ok(_) => panic!("text upload should be rejected"),
            Err(err) => err,
        };
        assert!(format!("{err:#}").contains("unsupported image type"));
        assert!(!out.join("customization.json").exists());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }
}
