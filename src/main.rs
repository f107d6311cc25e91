// permit-pdf: Permit to Transfer documents for air cargo container stations

use clap::Parser;
use eframe::egui;
use std::path::PathBuf;

use permit_pdf::app::PermitApp;
use permit_pdf::assets::AssetGate;
use permit_pdf::config::AppConfig;

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Permit to Transfer form and PDF export")]
struct Args {
    /// Configuration file (defaults to permit-pdf.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory exported PDFs are written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Skip fetching remote artwork at startup
    #[arg(long)]
    offline: bool,
}

fn main() -> eframe::Result {
    env_logger::init();
    let args = Args::parse();

    let cfg = AppConfig::load(args.config.as_deref());
    let out_dir = args
        .out_dir
        .or_else(|| cfg.out_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_out_dir);

    // Start loading fonts and artwork before the first frame.
    let gate = AssetGate::spawn(cfg.assets.clone(), args.offline);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Permit to Transfer",
        options,
        Box::new(move |_cc| Ok(Box::new(PermitApp::new(cfg, out_dir, gate)))),
    )
}

/// `$HOME/Downloads` when it exists, the working directory otherwise.
fn default_out_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let downloads = PathBuf::from(home).join("Downloads");
        if downloads.is_dir() {
            return downloads;
        }
    }
    PathBuf::from(".")
}
