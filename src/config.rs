use crate::GAME_TIME_LIMIT_MS;
use crate::Millis;
use crate::SNAPSHOT_INTERVAL_MS;
use crate::TRICK_DELAY_DEFAULT_MS;
use clap::Parser;
use std::path::PathBuf;

/// Server configuration. Every flag falls back to an environment
/// variable, then to the production default.
#[derive(Parser, Debug, Clone)]
#[command(name = "truco-fdp", about = "Authoritative Truco FDP game server")]
pub struct Config {
    /// Address the HTTP/WebSocket server binds to.
    #[arg(long, env = "TRUCO_BIND_ADDR", default_value = "0.0.0.0:3001")]
    pub bind: String,

    /// Path of the crash-safe snapshot file.
    #[arg(long, env = "TRUCO_SNAPSHOT_PATH", default_value = "data/state.json")]
    pub snapshot_path: PathBuf,

    /// Interval between periodic snapshots, in milliseconds.
    #[arg(long, env = "TRUCO_SNAPSHOT_INTERVAL_MS", default_value_t = SNAPSHOT_INTERVAL_MS)]
    pub snapshot_interval_ms: Millis,

    /// Pause between tricks so clients can animate, in milliseconds.
    #[arg(long, env = "TRUCO_TRICK_DELAY_MS", default_value_t = TRICK_DELAY_DEFAULT_MS)]
    pub trick_delay_ms: Millis,

    /// Whole-game time limit, in milliseconds.
    #[arg(long, env = "TRUCO_GAME_TIME_LIMIT_MS", default_value_t = GAME_TIME_LIMIT_MS)]
    pub game_time_limit_ms: Millis,

    /// Allowed CORS origins; permissive when empty.
    #[arg(long, env = "TRUCO_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// The fixed room set, as comma-separated identifiers.
    #[arg(
        long,
        env = "TRUCO_ROOMS",
        value_delimiter = ',',
        default_values_t = [
            "itajuba".to_string(),
            "piranguinho".to_string(),
            "brazopolis".to_string(),
            "paraisopolis".to_string(),
            "maria-da-fe".to_string(),
        ]
    )]
    pub rooms: Vec<String>,

    /// Skip snapshot restore and periodic persistence (test mode).
    #[arg(long, env = "TRUCO_EPHEMERAL", default_value_t = false)]
    pub ephemeral: bool,
}

impl Config {
    /// A display name for a room id: dashes to spaces, words
    /// capitalized.
    pub fn room_display_name(id: &str) -> String {
        id.split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_from(["truco-fdp"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_values() {
        let config = Config::default();
        assert_eq!(config.snapshot_interval_ms, 30_000);
        assert_eq!(config.trick_delay_ms, 10_000);
        assert_eq!(config.game_time_limit_ms, 3_600_000);
        assert_eq!(config.rooms.len(), 5);
        assert!(config.rooms.contains(&"itajuba".to_string()));
    }

    #[test]
    fn display_names_capitalize() {
        assert_eq!(Config::room_display_name("itajuba"), "Itajuba");
        assert_eq!(Config::room_display_name("maria-da-fe"), "Maria Da Fe");
    }
}
