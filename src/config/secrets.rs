//! Premium-site credential parsing.
//!
//! # Responsibilities
//! - Read `name,password` records from an environment variable and/or a
//!   secrets file
//! - Normalize CRLF/CR line endings before parsing
//! - Skip malformed lines with a diagnostic instead of failing startup

use std::fs;

use crate::config::schema::PremiumConfig;

/// One premium site's name (subdomain label) and upload password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumCredential {
    pub name: String,
    pub password: String,
}

/// Parse newline-separated `name,password` records. Blank lines are
/// ignored; malformed lines are skipped with a warning.
pub fn parse_premium_credentials(raw: &str) -> Vec<PremiumCredential> {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut creds = Vec::new();
    for line in normalized.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, password)) = line.split_once(',') else {
            tracing::warn!(line, "Malformed premium credential line skipped");
            continue;
        };
        let (name, password) = (name.trim().to_lowercase(), password.trim());
        if name.is_empty() || password.is_empty() {
            tracing::warn!(line, "Malformed premium credential line skipped");
            continue;
        }
        creds.push(PremiumCredential {
            name,
            password: password.to_string(),
        });
    }
    creds
}

/// Collect credentials from the configured env var, then the secrets file.
/// Later records win on duplicate names.
pub fn load_premium_credentials(config: &PremiumConfig) -> Vec<PremiumCredential> {
    let mut creds = Vec::new();
    if let Ok(raw) = std::env::var(&config.env_var) {
        creds.extend(parse_premium_credentials(&raw));
    }
    if let Some(path) = &config.secrets_file {
        match fs::read_to_string(path) {
            Ok(raw) => creds.extend(parse_premium_credentials(&raw)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Secrets file not read");
            }
        }
    }
    // keep the last record for each name
    let mut deduped: Vec<PremiumCredential> = Vec::new();
    for cred in creds {
        deduped.retain(|c| c.name != cred.name);
        deduped.push(cred);
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_malformed_lines() {
        let creds = parse_premium_credentials("suma,hunter2\nnot-a-record\n\ncorp,s3cret\n");
        assert_eq!(
            creds,
            vec![
                PremiumCredential {
                    name: "suma".into(),
                    password: "hunter2".into()
                },
                PremiumCredential {
                    name: "corp".into(),
                    password: "s3cret".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_normalizes_crlf() {
        let creds = parse_premium_credentials("suma,hunter2\r\ncorp,s3cret\r");
        assert_eq!(creds.len(), 2);
        assert_eq!(creds[1].name, "corp");
    }

    #[test]
    fn test_parse_lowercases_names() {
        let creds = parse_premium_credentials("SUMA, hunter2 ");
        assert_eq!(creds[0].name, "suma");
        assert_eq!(creds[0].password, "hunter2");
    }

    #[test]
    fn test_empty_password_skipped() {
        assert!(parse_premium_credentials("suma,").is_empty());
        assert!(parse_premium_credentials(",pw").is_empty());
    }
}
