use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::client::{ClientConfig, DEFAULT_URL};

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
}

pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    let mut url = url.or_else(|| std::env::var("DDECOAPI_URL").ok());
    let mut key = key.or_else(|| std::env::var("DDECOAPI_KEY").ok());
    let mut file_verify: Option<bool> = None;

    if url.is_none() || key.is_none() || verify.is_none() {
        for rc_path in rc_candidates() {
            if rc_path.exists() {
                let cfg = read_rc(&rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;
                debug!(path = %rc_path.display(), "loaded configuration file");

                url = url.or(cfg.url);
                key = key.or(cfg.key);
                file_verify = cfg.verify;
                break;
            }
        }
    }

    let url = url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let key = key.filter(|k| !k.trim().is_empty());
    if key.is_none() {
        debug!("no API key configured; only open endpoints will answer");
    }
    let verify = verify.or(file_verify).unwrap_or(true);

    Ok(ClientConfig { url, key, verify })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // `key:` may be left empty with the token on the following line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                let v = strip_quotes(line).to_string();
                match pk {
                    "url" => cfg.url = Some(v),
                    "key" => cfg.key = Some(v),
                    _ => {}
                }
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let v = strip_quotes(v.trim());
            match (k.trim(), v.is_empty()) {
                ("url", false) => cfg.url = Some(v.to_string()),
                ("url", true) => pending_key = Some("url"),
                ("key", false) => cfg.key = Some(v.to_string()),
                ("key", true) => pending_key = Some("key"),
                ("verify", false) => cfg.verify = Some(v != "0"),
                _ => {}
            }
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) DDECOAPI_RC (explicit)
    // 2) ./.ddecoapirc
    // 3) ~/.ddecoapirc
    if let Ok(p) = std::env::var("DDECOAPI_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".ddecoapirc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".ddecoapirc"));
    }
    v
}
