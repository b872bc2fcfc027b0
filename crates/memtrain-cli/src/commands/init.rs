//! The `memtrain init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("memtrain.toml").exists() {
        println!("memtrain.toml already exists, skipping.");
    } else {
        std::fs::write("memtrain.toml", SAMPLE_CONFIG)?;
        println!("Created memtrain.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit memtrain.toml with your service URL and token");
    println!("  2. Run: memtrain play --offline");
    println!("  3. Run: memtrain play --kind digits --output sessions");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# memtrain configuration

default_kind = "SEQUENCE_OF_WORDS"

[service]
base_url = "http://localhost:8080"
api_token = "${MEMTRAIN_TOKEN}"
timeout_secs = 30

[study]
trailing_pause_ms = 1000

[pacing]
buffer_seconds = 10.0
min_total_seconds = 20.0
max_total_seconds = 90.0
min_show_ms = 800
max_show_ms = 2500
show_fraction = 0.8
unknown_skill_seconds_per_item = 2.0
expert_seconds_per_item = 1.5

[[pacing.tiers]]
up_to_level = 2
seconds_per_item = 2.5

[[pacing.tiers]]
up_to_level = 4
seconds_per_item = 2.0

[[pacing.tiers]]
up_to_level = 6
seconds_per_item = 1.7

[offline]
words = 10
digits = 12
faces = 6
skill_level = 3
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_matches_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memtrain.toml");
        std::fs::write(&path, SAMPLE_CONFIG).unwrap();
        let config = memtrain_client::load_config_from(Some(&path)).unwrap();
        let defaults = memtrain_client::MemtrainConfig::default();
        assert_eq!(config.pacing, defaults.pacing);
        assert_eq!(config.default_kind, defaults.default_kind);
        assert_eq!(config.offline.digits, defaults.offline.digits);
    }
}
