use clap::Parser;
use std::path::Path;
use tissue_extract::core::annotator::load_font;
use tissue_extract::domain::ports::ConfigProvider;
use tissue_extract::utils::{logger, validation::Validate};
use tissue_extract::{Annotator, CliConfig, DetectionEngine, GeminiExtractor, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting tissue-extract ({:?} backend)", config.backend);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        return Err(e.into());
    }

    let file_path = Path::new(&config.file_path).to_path_buf();
    let font = load_font(config.font_path().map(Path::new))?;
    let storage = LocalStorage::new(config.output_dir());
    let annotator = Annotator::new(storage, config.output_dir(), font);
    let engine = DetectionEngine::new(GeminiExtractor::new(config), annotator);

    match engine.run(&file_path).await {
        Ok(report) => {
            match report.output_path {
                Some(path) => println!("Annotated image saved to: {}", path.display()),
                None if report.boxes.is_empty() => println!("No bounding boxes found to draw."),
                None => eprintln!("Error: Could not read image file {}", file_path.display()),
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Detection failed: {} (Category: {:?})", e, e.category());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            Err(e.into())
        }
    }
}
