//! Generate static files

use anyhow::{bail, Result};

use crate::generator::Generator;
use crate::notion::{ContentSource, NotionError};
use crate::snapshot::SnapshotStore;
use crate::Blog;

/// How `generate` runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Read the snapshot written by `fetch` instead of calling Notion
    pub offline: bool,
    /// Build only this post or page
    pub slug: Option<String>,
}

/// Generate the static site
pub async fn run(blog: &Blog, options: &GenerateOptions) -> Result<()> {
    let start = std::time::Instant::now();

    if options.offline && !SnapshotStore::new(&blog.snapshot_dir).exists() {
        bail!(
            "No snapshot found in {:?}, run `fetch` first",
            blog.snapshot_dir
        );
    }

    let source = ContentSource::for_blog(blog, options.offline)?;
    let generator = Generator::new(blog)?;

    match &options.slug {
        Some(slug) => {
            if let Err(e) = generator.generate_post(&source, slug).await {
                if is_not_found(&e) {
                    tracing::error!("Post not found: {}", slug);
                }
                return Err(e);
            }
            tracing::info!("Generated {}", slug);
        }
        None => {
            let report = generator.generate(&source).await?;
            tracing::info!("{}", report.summary());
        }
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

/// Whether an error means the requested post does not exist
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NotionError>()
        .map(NotionError::is_not_found)
        .unwrap_or(false)
}
