use std::path::PathBuf;

/// Gets the default configuration file path for the client.
/// - Linux: ~/.config/gemini-web/config.toml
/// - macOS: ~/Library/Application Support/gemini-web/config.toml
/// - Windows: %APPDATA%/gemini-web/config.toml
pub fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("gemini-web/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_toml() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("gemini-web/config.toml"));
        }
    }
}
