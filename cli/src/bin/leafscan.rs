use clap::{Parser, Subcommand, ValueEnum};
use cli::AppConfig;
use color_eyre::eyre::Result;
use leaf_server::responses::AnalyzeResponse;
use leafscan::{BurnClassifier, DefaultBackend, LabelCatalog, LeafCnnConfig};
use shops::{Coordinates, ShopLookup, shops_to_geojson};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogFormat {
    Toml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve,
    /// Classify a single leaf photo
    Classify {
        /// Path to the image file
        #[arg(short, long)]
        image: PathBuf,
        /// Print the full JSON response, preview included
        #[arg(long)]
        json: bool,
    },
    /// List fertilizer shops around a location
    Shops {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Print a GeoJSON FeatureCollection instead of a table
        #[arg(long)]
        geojson: bool,
    },
    /// Print the label catalog
    Labels {
        /// Catalog file to read instead of the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "toml")]
        format: CatalogFormat,
    },
    /// Write an untrained model directory, for wiring tests and demos
    InitModel {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "38")]
        classes: usize,
        /// Square input side in pixels
        #[arg(long, default_value = "64")]
        size: usize,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = AppConfig::read(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.initial_log_level()))
        )
        .init();

    // After the subscriber, so rejected overrides are reported
    let config = config.with_env();

    match cli.command {
        Commands::Serve => serve(&config).await?,
        Commands::Classify { image, json } => classify(&config, &image, json)?,
        Commands::Shops { lat, lng, geojson } => find_shops(&config, lat, lng, geojson).await?,
        Commands::Labels { catalog, format } => print_labels(&config, catalog.as_deref(), format)?,
        Commands::InitModel { output, classes, size } => init_model(&output, classes, size)?,
        Commands::Schema => println!("{}", AppConfig::schema()?),
    }

    Ok(())
}

async fn serve(config: &AppConfig) -> Result<()> {
    info!(model = %config.model.dir.display(), "Loading model");
    let server = config.build_server()?;
    info!("Starting leaf classifier at {}", server.server_url());
    server.run().await?;
    Ok(())
}

fn classify(config: &AppConfig, image: &Path, json: bool) -> Result<()> {
    let pipeline = config.build_pipeline()?;
    let bytes = std::fs::read(image)?;
    let result = pipeline.process(&bytes)?;

    if json {
        let response = AnalyzeResponse::from(result);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("Prediction:  {}", result.label.as_str());
        println!("Confidence:  {:.2}%", result.confidence * 100.0);
        println!("Care:        {}", result.care.as_str());
    }
    Ok(())
}

async fn find_shops(config: &AppConfig, lat: f64, lng: f64, geojson: bool) -> Result<()> {
    let coords = Coordinates::new(lat, lng)?;
    let client = config.shop_client()?;
    let shops = client.find_shops(coords).await?;

    if geojson {
        println!("{}", serde_json::to_string_pretty(&shops_to_geojson(&shops))?);
        return Ok(());
    }

    if shops.is_empty() {
        warn!("No shops found within {} m of {}", config.shops.radius_m, coords);
    }
    for shop in &shops {
        println!("{} | {} | {:.5}, {:.5}", shop.name, shop.address, shop.lat, shop.lng);
    }
    Ok(())
}

fn print_labels(config: &AppConfig, catalog: Option<&Path>, format: CatalogFormat) -> Result<()> {
    let catalog = match catalog {
        Some(path) => LabelCatalog::from_file(path)?,
        None => config.load_catalog()?,
    };

    let output = match format {
        CatalogFormat::Toml => catalog.to_toml()?,
        CatalogFormat::Json => catalog.to_json()?,
    };
    println!("{}", output);
    Ok(())
}

fn init_model(output: &Path, classes: usize, size: usize) -> Result<()> {
    let model_config = LeafCnnConfig::new()
        .with_num_classes(classes)
        .with_input_height(size)
        .with_input_width(size);

    std::fs::create_dir_all(output)?;
    BurnClassifier::<DefaultBackend>::random(model_config, Default::default())?.save(output)?;

    info!("✅ Wrote untrained {}-class model to {}", classes, output.display());
    Ok(())
}
