//! Terminal rendering of generation events.

use brief_api::SummaryResult;
use indicatif::{ProgressBar, ProgressStyle};
use readbrief::{GenerationObserver, ResumeOffer};

pub struct ConsoleObserver {
    bar: ProgressBar,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl GenerationObserver for ConsoleObserver {
    fn on_progress(&self, label: &str, percent: u8) {
        self.bar.set_position(percent as u64);
        self.bar.set_message(label.to_string());
    }

    fn on_completed(&self, result: &SummaryResult) {
        self.bar.finish_and_clear();
        eprintln!(
            "Generation complete for {} chapter(s)!",
            result.total_chapters
        );
        println!(
            "Chapters analyzed: {} ({})",
            result.total_chapters,
            result.chapters_label()
        );
        println!();
        println!("{}", result.gemini_summary);
    }

    fn on_error(&self, message: &str) {
        self.bar.abandon();
        eprintln!("Error during generation: {}", message);
    }

    fn on_recovery_offer(&self, offer: &ResumeOffer) {
        eprintln!(
            "An interrupted generation was found for \"{}\" ({} chapter(s), {}).",
            offer.book_name,
            offer.chapters.len(),
            offer.mode
        );
        eprintln!("Time elapsed: {}s", offer.elapsed_seconds);
    }

    fn on_cancelled(&self) {
        self.bar.abandon_with_message("Generation cancelled");
        eprintln!("Generation cancelled");
    }
}
