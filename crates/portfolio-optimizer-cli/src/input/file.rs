use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON request file into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Resolve relative to the working directory and require an existing file.
pub fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio_optimizer_core::backtest::BacktestRequest;
    use std::io::Write;

    #[test]
    fn test_read_backtest_request() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "allocations": [{{"ticker": "AAPL", "weight_pct": "60"}}, {{"ticker": "MSFT", "weight_pct": 40}}],
                "date_range": {{"start": "2023-01-01", "end": "2023-12-31"}},
                "initial_investment": 10000,
                "risk_free_rate_pct": 2
            }}"#
        )
        .unwrap();
        let req: BacktestRequest = read_json(f.path().to_str().unwrap()).unwrap();
        assert_eq!(req.allocations.len(), 2);
        assert_eq!(req.allocations[1].ticker, "MSFT");
    }

    #[test]
    fn test_missing_file() {
        let err = read_json::<BacktestRequest>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
