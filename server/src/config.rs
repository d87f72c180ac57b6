use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_RESCAN_SECS: u64 = 300;
pub const DEFAULT_LOCATIONS_REFRESH_SECS: u64 = 3600; // hourly
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;

pub const LOCATIONS_FILE: &str = "locations.json";
pub const SEASON_CACHE_CONTROL: &str = "public, max-age=300";

fn env_positive<T: std::str::FromStr + PartialOrd + Default>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn server_port() -> u16 {
    env_positive("FRCMAP_PORT").unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn data_dir() -> PathBuf {
    env_non_empty("FRCMAP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn static_dir() -> PathBuf {
    env_non_empty("FRCMAP_STATIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

/// Remote override feed. When unset, `locations.json` in the data dir is used.
pub fn locations_url() -> Option<String> {
    env_non_empty("FRCMAP_LOCATIONS_URL")
}

pub fn rescan_interval() -> Duration {
    Duration::from_secs(env_positive("FRCMAP_RESCAN_SECS").unwrap_or(DEFAULT_RESCAN_SECS))
}

pub fn locations_refresh_interval() -> Duration {
    Duration::from_secs(
        env_positive("FRCMAP_LOCATIONS_REFRESH_SECS").unwrap_or(DEFAULT_LOCATIONS_REFRESH_SECS),
    )
}

pub fn http_timeout() -> Duration {
    Duration::from_secs(env_positive("FRCMAP_HTTP_TIMEOUT_SECS").unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        temp_env::with_vars_unset(
            [
                "FRCMAP_PORT",
                "FRCMAP_DATA_DIR",
                "FRCMAP_STATIC_DIR",
                "FRCMAP_LOCATIONS_URL",
                "FRCMAP_RESCAN_SECS",
                "FRCMAP_HTTP_TIMEOUT_SECS",
            ],
            || {
                assert_eq!(server_port(), 3000);
                assert_eq!(data_dir(), PathBuf::from("data"));
                assert_eq!(static_dir(), PathBuf::from("client/dist"));
                assert_eq!(locations_url(), None);
                assert_eq!(rescan_interval(), Duration::from_secs(300));
                assert_eq!(http_timeout(), Duration::from_secs(10));
            },
        );
    }

    #[test]
    fn env_values_override_defaults() {
        temp_env::with_vars(
            [
                ("FRCMAP_PORT", Some("8080")),
                ("FRCMAP_DATA_DIR", Some("/srv/frc")),
                ("FRCMAP_LOCATIONS_URL", Some(" https://example.org/locations.json ")),
                ("FRCMAP_RESCAN_SECS", Some("30")),
            ],
            || {
                assert_eq!(server_port(), 8080);
                assert_eq!(data_dir(), PathBuf::from("/srv/frc"));
                assert_eq!(
                    locations_url().as_deref(),
                    Some("https://example.org/locations.json")
                );
                assert_eq!(rescan_interval(), Duration::from_secs(30));
            },
        );
    }

    #[test]
    fn invalid_or_zero_values_fall_back() {
        temp_env::with_vars(
            [
                ("FRCMAP_PORT", Some("0")),
                ("FRCMAP_RESCAN_SECS", Some("soon")),
                ("FRCMAP_LOCATIONS_REFRESH_SECS", Some("-5")),
                ("FRCMAP_LOCATIONS_URL", Some("   ")),
                ("FRCMAP_STATIC_DIR", Some("")),
            ],
            || {
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(rescan_interval(), Duration::from_secs(DEFAULT_RESCAN_SECS));
                assert_eq!(
                    locations_refresh_interval(),
                    Duration::from_secs(DEFAULT_LOCATIONS_REFRESH_SECS)
                );
                assert_eq!(locations_url(), None);
                assert_eq!(static_dir(), PathBuf::from(DEFAULT_STATIC_DIR));
            },
        );
    }
}
