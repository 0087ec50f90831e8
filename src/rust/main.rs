use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use image_classifier::{Classifier, ClassifierOptions, LabelCatalog};
use log::info;
use ndarray::Array3;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the model file
    model: PathBuf,

    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON file with classifier options; flags below override it
    #[arg(long)]
    options: Option<PathBuf>,

    /// Labels file, one label per line, used instead of the builtin table
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Maximum number of results per image (0 for unlimited)
    #[arg(short, long)]
    max_results: Option<i32>,

    /// Minimum score a result needs
    #[arg(short, long)]
    score_threshold: Option<f32>,

    /// Number of CPU threads for inference
    #[arg(short, long)]
    threads: Option<usize>,

    /// Request the EdgeTPU accelerator (not available with ONNX Runtime)
    #[arg(long)]
    edgetpu: bool,

    /// Only report these labels
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<String>>,

    /// Never report these labels
    #[arg(long, value_delimiter = ',')]
    deny: Option<Vec<String>>,

    /// Feed images as-is instead of resizing them to the model input
    #[arg(long)]
    no_preprocess: bool,
}

impl Args {
    fn classifier_options(&self) -> Result<ClassifierOptions> {
        let mut options = match &self.options {
            Some(path) => ClassifierOptions::from_json_file(path)?,
            None => ClassifierOptions::default().with_preprocess(true),
        };

        if let Some(max_results) = self.max_results {
            options = options.with_max_results(max_results);
        }
        if let Some(threshold) = self.score_threshold {
            options = options.with_score_threshold(threshold);
        }
        if let Some(threads) = self.threads {
            options = options.with_num_threads(threads);
        }
        if self.edgetpu {
            options = options.with_edgetpu(true);
        }
        if let Some(allow) = &self.allow {
            options = options.with_label_allow_list(allow.clone());
        }
        if let Some(deny) = &self.deny {
            options = options.with_label_deny_list(deny.clone());
        }
        if self.no_preprocess {
            options = options.with_preprocess(false);
        }
        Ok(options)
    }
}

fn load_image(path: &Path) -> Result<Array3<u8>> {
    let rgb = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw())
        .with_context(|| format!("Unexpected pixel layout in {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("=== Starting Image Classifier ===");
    let start_time = Instant::now();

    let mut builder = Classifier::builder()
        .with_model_path(&args.model)
        .with_options(args.classifier_options()?);
    if let Some(labels) = &args.labels {
        builder = builder.with_labels(LabelCatalog::from_file(labels)?);
    }
    let mut classifier = builder
        .build()
        .with_context(|| format!("Failed to build classifier for {}", args.model.display()))?;

    let info = classifier.info();
    info!(
        "Model input {}x{} ({:?}), {} labels, quantized input: {}, quantized output: {}",
        info.input_width,
        info.input_height,
        info.input_layout,
        info.num_labels,
        info.quantized_input,
        info.quantized_output
    );
    let build_time = start_time.elapsed();
    info!("=== Classifier Built Successfully (took {:.2?}) ===", build_time);

    let classify_start = Instant::now();
    for path in &args.images {
        let image = load_image(path)?;
        let results = classifier
            .classify(image.view())
            .with_context(|| format!("Failed to classify {}", path.display()))?;

        println!("\n{}:", path.display());
        if results.is_empty() {
            println!("  (no results above threshold)");
        }
        for category in results {
            println!("  {}: {:.1}%", category.label, category.score * 100.0);
        }
    }

    let classify_time = classify_start.elapsed();
    info!("Classification time: {:.2?}", classify_time);
    info!(
        "Average time per image: {:.2?}",
        classify_time / args.images.len() as u32
    );

    Ok(())
}
