mod capture;
mod catalog;
mod catalog_source;
mod config;
mod ocr_rank;
mod packing;
mod resolver;
mod text_normalize;

use capture::{LineCapture, ScanController, ScanMode, ScanOutcome, ScanPipeline};
use catalog::CatalogIndex;
use config::Config;
use packing::shipment::{PreparedCarton, ShipmentLineDraft, carton_conflicts, total_weight_g};
use packing::{
    CartonSelection, OrderLineDraft, compute_remaining_stock, line_metrics, select_carton,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: stock_scan <command>
  resolve [--lines <lines.json>] <text>
                                 match text to one product, with its stock
  ocr <text>                     rank products against an OCR transcription
  suggest [query]                list products whose name starts with query
  pack <lines.json> [format_id]  per-line carton and stock metrics
  weigh <shipment.json>          shipment weight in grams and carton conflicts
  scan [--ocr]                   read scanner input from stdin
  select-format <id>             save the default carton format";

fn config_path() -> PathBuf {
    std::env::var_os("STOCK_SCAN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".config/stock_scan.toml"))
}

async fn read_lines(path: &str) -> Result<Vec<OrderLineDraft>, Box<dyn std::error::Error>> {
    Ok(serde_json::from_str(&tokio::fs::read_to_string(path).await?)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Body of a `weigh` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShipmentDraft {
    cartons: Vec<Value>,
    lines: Vec<ShipmentLineDraft>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg_path = config_path();
    let cfg = Config::load_or_default(&cfg_path)?;

    // init tracing; RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter));
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return Ok(());
    };
    let rest = &args[1..];

    if command == "select-format" {
        let Some(id) = rest.first() else {
            return Err("select-format needs a format id".into());
        };
        Config::set_default_format(&cfg_path, id)?;
        info!(format = %id, config = %cfg_path.display(), "Default carton format saved");
        return Ok(());
    }

    let index = catalog_source::load_catalog(&cfg.catalog).await?;
    info!(
        products = index.len(),
        loaded_at = %index.loaded_at(),
        "Catalog ready"
    );
    if index.is_empty() {
        warn!("Catalog is empty, nothing will resolve");
    }

    match command.as_str() {
        "resolve" => {
            let (lines, words) = match rest {
                [flag, path, words @ ..] if flag == "--lines" => (read_lines(path).await?, words),
                words => (Vec::new(), words),
            };
            let input = words.join(" ");
            let hit = resolver::resolve_position(&index, &input)
                .and_then(|r| index.get(r.position).map(|entry| (r.kind, entry)));
            let out = match hit {
                Some((kind, entry)) => json!({
                    "code_value": entry.code_value,
                    "name": entry.name,
                    "kind": kind,
                    "defaults": resolver::defaults_for(&index, &input),
                    "stock": compute_remaining_stock(&index, &lines, entry),
                }),
                None => Value::Null,
            };
            print_json(&out)?;
        }
        "ocr" => {
            let text = rest.join(" ");
            print_json(&ocr_rank::rank(&index, &text, cfg.matching.rank_options()))?;
        }
        "suggest" => {
            let query = rest.join(" ");
            print_json(&resolver::suggest(
                &index,
                &query,
                cfg.matching.suggestion_limit,
            ))?;
        }
        "pack" => {
            let Some(lines_path) = rest.first() else {
                return Err("pack needs a JSON file of order lines".into());
            };
            let lines = read_lines(lines_path).await?;
            let formats = catalog_source::load_formats(&cfg.catalog).await?;
            let selection = CartonSelection::from_value(
                rest.get(1).unwrap_or(&cfg.packing.default_format),
            );
            let carton = select_carton(&formats, &selection, &cfg.packing.custom);
            if !carton.is_complete() {
                warn!(?selection, "Carton dimensions incomplete, limits may be partial");
            }
            print_json(&line_metrics(&index, &lines, &carton))?;
        }
        "weigh" => {
            let Some(path) = rest.first() else {
                return Err("weigh needs a JSON shipment file".into());
            };
            let draft: ShipmentDraft =
                serde_json::from_str(&tokio::fs::read_to_string(path).await?)?;
            let cartons: Vec<PreparedCarton> = draft
                .cartons
                .iter()
                .filter_map(PreparedCarton::from_value)
                .collect();
            let lines: Vec<ShipmentLineDraft> = draft
                .lines
                .into_iter()
                .map(ShipmentLineDraft::with_carton_applied)
                .collect();
            print_json(&json!({
                "total_weight_g": total_weight_g(&index, &cartons, &lines),
                "conflicts": carton_conflicts(&lines),
            }))?;
        }
        "scan" => {
            let mode = if rest.iter().any(|a| a == "--ocr") {
                ScanMode::Ocr
            } else {
                ScanMode::Code
            };
            scan_stdin(&index, mode, &cfg).await?;
        }
        other => {
            eprintln!("unknown command: {other}\n{USAGE}");
        }
    }

    Ok(())
}

async fn scan_stdin(
    index: &CatalogIndex,
    mode: ScanMode,
    cfg: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = ScanPipeline::new(index, mode, cfg.matching.rank_options());
    let mut controller = ScanController::new();

    let source = LineCapture::new(BufReader::new(tokio::io::stdin()));
    let token = match controller.start_session(Box::new(source)).await {
        Ok(token) => token,
        Err(_) => {
            eprintln!("{}", controller.status().message());
            return Ok(());
        }
    };

    loop {
        match controller.next_text().await {
            Ok(Some(raw)) => {
                let outcome = pipeline.apply(&token, &raw);
                if outcome != ScanOutcome::Stale {
                    eprintln!("{}", controller.status().message());
                    print_json(&outcome)?;
                }
            }
            Ok(None) => break,
            Err(_) => {
                eprintln!("{}", controller.status().message());
                break;
            }
        }
    }

    controller.stop().await;
    Ok(())
}
