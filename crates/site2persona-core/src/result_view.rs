use std::time::{Duration, Instant};

use crate::state::{CompanyAnalysis, Product};

pub const COPIED_ACK_DURATION: Duration = Duration::from_secs(2);
/// Products listed in the profile section
pub const MAX_LISTED_PRODUCTS: usize = 4;
/// Characters of each product description shown in the profile section
pub const PRODUCT_DESCRIPTION_CHARS: usize = 50;

/// A labelled value in the summary row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryCard {
    pub title: &'static str,
    pub value: String,
}

pub fn summary_cards(analysis: &CompanyAnalysis) -> [SummaryCard; 4] {
    [
        SummaryCard {
            title: "Industry",
            value: analysis.industry.clone(),
        },
        SummaryCard {
            title: "Tone",
            value: analysis.brand_tone.clone(),
        },
        SummaryCard {
            title: "Key Focus",
            value: analysis
                .key_selling_points
                .first()
                .cloned()
                .unwrap_or_else(|| "N/A".to_string()),
        },
        SummaryCard {
            title: "Audience",
            value: analysis
                .target_audience
                .first()
                .cloned()
                .unwrap_or_else(|| "General".to_string()),
        },
    ]
}

/// `(name, shortened description)` for the first few products
pub fn listed_products(analysis: &CompanyAnalysis) -> Vec<(String, String)> {
    analysis
        .products
        .iter()
        .take(MAX_LISTED_PRODUCTS)
        .map(|Product { name, description }| {
            let short: String = description.chars().take(PRODUCT_DESCRIPTION_CHARS).collect();
            (name.clone(), format!("{}...", short))
        })
        .collect()
}

/// Toggle and copy-acknowledgment state for the result pane
#[derive(Debug, Clone, Default)]
pub struct ResultView {
    pub show_prompt: bool,
    pub scroll: u16,
    copied_at: Option<Instant>,
}

impl ResultView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_prompt(&mut self) {
        self.show_prompt = !self.show_prompt;
    }

    pub fn mark_copied(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_at
            .map(|at| now.saturating_duration_since(at) < COPIED_ACK_DURATION)
            .unwrap_or(false)
    }

    /// Drop an expired acknowledgment (called by Tick event)
    pub fn tick(&mut self, now: Instant) {
        if !self.is_copied(now) {
            self.copied_at = None;
        }
    }
}
