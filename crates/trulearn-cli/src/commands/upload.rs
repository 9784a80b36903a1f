//! The `trulearn upload` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use trulearn_client::{create_backend, load_config_from};

pub async fn execute(file: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(file.is_file(), "{} is not a file", file.display());

    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config.service)?;

    let upload = backend
        .references
        .upload_reference(&file)
        .await
        .with_context(|| format!("failed to upload {}", file.display()))?;

    println!("Uploaded {}", upload.filename);
    println!("Concept: {}", upload.concept);
    eprintln!(
        "Pass --filename {} to `trulearn generate`, or set reference_pdf in the answer sheet.",
        upload.filename
    );
    Ok(())
}
