//! pdfscope - inspect and assemble PDFs through pdflib-scope
//!
//! Usage:
//!   pdfscope inspect <FILE>...              Show version and page sizes
//!   pdfscope merge -o <OUT> <FILE>...        Concatenate the pages of PDFs
//!   pdfscope images -o <OUT> <IMAGE>...      One page per image

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdflib_engine::{MemoryEngine, PdfEngine};
use pdflib_scope::config::default_config_path;
use pdflib_scope::{load_config, Config, Factory, PdiDocument, RootObject, OPTION_ADJUST_PAGE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfscope")]
#[command(about = "Inspect and assemble PDF documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "PDFSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// License key, overrides the config file
    #[arg(long, global = true, env = "PDFSCOPE_LICENSE_KEY", hide_env_values = true)]
    license_key: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show PDF version and page sizes
    Inspect {
        /// PDF files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Concatenate the pages of several PDFs into one document
    Merge {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Input PDFs, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Create a document with one page per image
    Images {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// PDF version times ten (17 for PDF 1.7)
        #[arg(long, default_value = "17")]
        pdf_version: u32,

        /// Input images (png, jpeg, gif)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let factory = build_factory(cli.config.as_deref(), cli.license_key.as_deref())?;
    match cli.command {
        Commands::Inspect { files } => cmd_inspect(&factory, &files),
        Commands::Merge {
            output,
            title,
            files,
        } => cmd_merge(&factory, &output, title.as_deref(), &files),
        Commands::Images {
            output,
            pdf_version,
            files,
        } => cmd_images(&factory, &output, pdf_version, &files),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn engine() -> Box<dyn PdfEngine> {
    Box::new(MemoryEngine::new())
}

fn build_factory(config_path: Option<&Path>, license_key: Option<&str>) -> Result<Factory> {
    let config = match config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match default_config_path().and_then(|path| load_config(&path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {err}. Using defaults.");
                Config::default()
            }
        },
    };

    let mut factory = Factory::from_config(engine, &config)?;
    if let Some(key) = license_key {
        factory.set_license_key(key);
    }
    debug!(?factory, "factory ready");
    Ok(factory)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Open `path` for import through a virtual file named after it.
fn open_input(root: &RootObject, path: &Path) -> Result<PdiDocument> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = root
        .open_pdi_document_with_virtual_file(&data, file_name(path), "")
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(document)
}

fn output_path(path: &Path) -> Result<&str> {
    match path.to_str() {
        Some(path) => Ok(path),
        None => bail!("Output path is not valid UTF-8: {}", path.display()),
    }
}

fn cmd_inspect(factory: &Factory, files: &[PathBuf]) -> Result<()> {
    let root = factory.create_root_object()?;
    for path in files {
        let document = open_input(&root, path)?;
        let version = document.pdf_version()?;
        let pages = document.page_count()?;

        println!("{}", path.display());
        println!("  PDF version: {}.{}", version / 10, version % 10);
        println!("  Pages:       {pages}");
        for number in 1..=pages as i32 {
            let width = document.page_width(number)?;
            let height = document.page_height(number)?;
            println!("  {number:>4}: {width:.1} x {height:.1} pt");
        }
    }
    Ok(())
}

fn cmd_merge(
    factory: &Factory,
    output: &Path,
    title: Option<&str>,
    files: &[PathBuf],
) -> Result<()> {
    let root = factory.create_root_object()?;
    let inputs = files
        .iter()
        .map(|path| open_input(&root, path))
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = inputs.first() else {
        bail!("No input files");
    };

    let document = root.create_document_like(first, output_path(output)?)?;
    if let Some(title) = title {
        document.set_title(title)?;
    }
    document.set_creator("pdfscope")?;

    let mut total = 0;
    for (input, path) in inputs.iter().zip(files) {
        let pages = input.page_count()?;
        for number in 1..=pages as i32 {
            let imported = document.load_pdi_page(input, number, "")?;
            let mut page = document.create_page(imported.width(), imported.height(), "")?;
            imported.fit_on_page(0.0, 0.0, OPTION_ADJUST_PAGE)?;
            page.finish("")?;
            imported.close()?;
        }
        info!(file = %path.display(), pages, "merged");
        total += pages;
    }

    document.finish(false, "")?;
    println!("Wrote {total} page(s) to {}", output.display());
    Ok(())
}

fn cmd_images(factory: &Factory, output: &Path, pdf_version: u32, files: &[PathBuf]) -> Result<()> {
    let root = factory.create_root_object()?;
    let document = root.create_document_with_version(pdf_version, output_path(output)?)?;
    document.set_creator("pdfscope")?;

    for path in files {
        let (width, height) = image::image_dimensions(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let data =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let image = document.load_image_from_bytes(&data, "auto", "")?;

        let mut page = document.create_page(f64::from(width), f64::from(height), "")?;
        image.fit_on_page(0.0, 0.0, OPTION_ADJUST_PAGE)?;
        page.finish("")?;
        image.close()?;
        info!(file = %path.display(), width, height, "added image page");
    }

    document.finish(false, "")?;
    println!("Wrote {} page(s) to {}", files.len(), output.display());
    Ok(())
}
