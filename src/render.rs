//! Terminal rendering of a search.
//!
//! Consumes `ConsumerEvent`s as they arrive. Human output shows a progress
//! bar while products stream in and prints product cards once the search is
//! complete; JSON output prints one event per line.

use crate::catalog::{ProductRecord, NO_REVIEW};
use crate::error::{Error, Result};
use crate::streaming::{progress_percent, ConsumerEvent, EventReceiver, SearchSnapshot};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bar and product cards
    #[default]
    Human,
    /// One JSON event per line
    Json,
}

/// Drain `rx` until the terminal event and render along the way.
///
/// Returns the final snapshot, or `Error::Search` if the search failed or
/// the consumer went away without finishing.
pub async fn render_events(
    mut rx: EventReceiver,
    format: OutputFormat,
    category: Option<&str>,
) -> Result<SearchSnapshot> {
    let progress = match format {
        OutputFormat::Human => Some(progress_bar()),
        OutputFormat::Json => None,
    };
    let mut products = 0usize;

    while let Some(event) = rx.recv().await {
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            ConsumerEvent::Category(name) => {
                if let Some(pb) = &progress {
                    pb.println(format!("{} {}", "category".cyan(), name));
                }
            }
            ConsumerEvent::Product(_) => {
                products += 1;
                if let Some(pb) = &progress {
                    let percent = progress_percent(products);
                    pb.set_position(percent);
                    pb.set_message(format!("Loading... {}%", percent));
                }
            }
            ConsumerEvent::Association { .. } => {}
            ConsumerEvent::Complete(snapshot) => {
                if let Some(pb) = progress {
                    pb.finish_and_clear();
                    print_results(&snapshot, category);
                }
                return Ok(snapshot);
            }
            ConsumerEvent::Error(message) => {
                if let Some(pb) = progress {
                    pb.abandon();
                }
                return Err(Error::Search(message));
            }
        }
    }

    Err(Error::Search("consumer stopped before completion".to_string()))
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

fn print_results(snapshot: &SearchSnapshot, category: Option<&str>) {
    let shown = snapshot.products_in(category);
    let heading = match category {
        Some(category) => format!("{} ({} items)", category, shown.len()),
        None => format!("All Products ({} items)", shown.len()),
    };
    println!("{}", heading.bold());

    if shown.is_empty() {
        println!("No products found. Try adjusting your search or filters.");
    }
    for product in shown {
        println!();
        println!("{}", product_card(product));
    }

    println!();
    println!("{}", summary(snapshot).green());
}

/// Multi-line text card for one product.
pub fn product_card(product: &ProductRecord) -> String {
    format!(
        "{}\n  Brand: {}\n  Sport: {}\n  {}\n  ${}\n  {}",
        product.name.bold(),
        product.brand,
        product.sport,
        review_stars(product),
        product.price,
        product.image_url().dimmed()
    )
}

const MAX_STARS: f64 = 5.0;

/// Star rating for a product, one star per point, at most five.
pub fn review_stars(product: &ProductRecord) -> String {
    if product.review_score.trim().is_empty() || product.review_score == NO_REVIEW {
        return "No reviews yet".to_string();
    }
    match product.review_value() {
        Some(score) => "*".repeat(score.clamp(0.0, MAX_STARS).round() as usize),
        None => "Invalid review score".to_string(),
    }
}

pub fn summary(snapshot: &SearchSnapshot) -> String {
    format!(
        "Found {} products across {} categories.",
        snapshot.products.len(),
        snapshot.categories.len()
    )
}
