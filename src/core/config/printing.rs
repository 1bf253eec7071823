use crate::core::config::data::{Config, Settings};

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(unset)")
}

fn show_ms(value: Option<u64>) -> String {
    value
        .map(|ms| format!("{ms} ms"))
        .unwrap_or_else(|| "(unset)".to_string())
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  api_base_url: {}", show(&self.api_base_url));
        println!("  blob_base_url: {}", show(&self.blob_base_url));
        println!("  upload_path: {}", show(&self.upload_path));
        println!("  poll_interval_ms: {}", show_ms(self.poll_interval_ms));
        println!("  typewriter.speed_ms: {}", show_ms(self.typewriter.speed_ms));
        println!("  typewriter.interval_ms: {}", show_ms(self.typewriter.interval_ms));
        println!(
            "  typewriter.tree_speed_ms: {}",
            show_ms(self.typewriter.tree_speed_ms)
        );
        println!("  typewriter.cursor: {}", show(&self.typewriter.cursor));
    }
}

impl Settings {
    pub fn print_effective(&self) {
        println!("Effective settings:");
        println!("  api: {}", self.api_base_url);
        println!("  blob: {}", self.blob_base_url);
        println!("  upload: {}", self.upload_url);
        println!(
            "  token: {}",
            if self.token.is_some() { "set" } else { "(none)" }
        );
        println!("  poll interval: {} ms", self.poll_interval.as_millis());
    }
}
