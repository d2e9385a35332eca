//! SSL policy resolution from URL query parameters.

use std::collections::HashMap;

use super::config::{SslOptions, SslPolicy};
use crate::error::{GatewayError, GatewayResult};

const MATERIAL_PARAMS: [&str; 5] = [
    "sslcert",
    "sslkey",
    "sslrootcert",
    "sslpassword",
    "sslservername",
];

/// Query parameters of a URL-dialect connection string.
///
/// The first occurrence of a key wins and empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct UrlParams {
    values: HashMap<String, String>,
}

impl UrlParams {
    /// Collect parameters from decoded key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            let value = value.into();
            if value.is_empty() {
                continue;
            }
            values.entry(key.into()).or_insert(value);
        }
        Self { values }
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn owned(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Derive the TLS stance from URL query parameters.
///
/// Returns `Ok(None)` when the parameters express no opinion, leaving the
/// adapter default in force.
///
/// ```rust
/// use sqlgate_query::connection::{resolve_ssl, SslPolicy, UrlParams};
///
/// let params = UrlParams::from_pairs([("sslmode", "verify")]);
/// assert_eq!(resolve_ssl(&params).unwrap(), Some(SslPolicy::reject_unauthorized(true)));
/// ```
pub fn resolve_ssl(params: &UrlParams) -> GatewayResult<Option<SslPolicy>> {
    let mode = params.get("sslmode");
    let has_materials = MATERIAL_PARAMS.iter().any(|key| params.get(key).is_some());

    if mode == Some("disable") && has_materials {
        return Err(GatewayError::conflicting_ssl(
            "sslmode=disable cannot be used with SSL certificate parameters \
             (sslcert, sslkey, sslrootcert, sslpassword, sslservername)",
        ));
    }

    if let Some(mode) = mode {
        if !has_materials {
            match mode {
                "disable" => return Ok(Some(SslPolicy::Disabled)),
                "no-verify" => return Ok(Some(SslPolicy::reject_unauthorized(false))),
                "verify" => return Ok(Some(SslPolicy::reject_unauthorized(true))),
                _ => {}
            }
        }
    }

    if mode.is_some() || has_materials {
        let insecure = match mode {
            Some("prefer") | Some("no-verify") => true,
            Some("require") => params.get("sslrootcert").is_none() && !has_materials,
            _ => false,
        };

        return Ok(Some(SslPolicy::Enabled(SslOptions {
            reject_unauthorized: insecure.then_some(false),
            cert: params.owned("sslcert"),
            key: params.owned("sslkey"),
            ca: params.owned("sslrootcert"),
            passphrase: params.owned("sslpassword"),
            servername: params.owned("sslservername"),
        })));
    }

    Ok(match params.get("ssl") {
        Some(flag) if flag == "1" || flag.eq_ignore_ascii_case("true") => Some(SslPolicy::implicit()),
        Some(flag) if flag == "0" || flag.eq_ignore_ascii_case("false") => Some(SslPolicy::Disabled),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(pairs: &[(&str, &str)]) -> GatewayResult<Option<SslPolicy>> {
        resolve_ssl(&UrlParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_disable_with_materials_conflicts() {
        for material in MATERIAL_PARAMS {
            let err = resolve(&[("sslmode", "disable"), (material, "x")]).unwrap_err();
            assert!(matches!(err, GatewayError::ConflictingSslConfig(_)), "{material}");
        }
    }

    #[test]
    fn test_conflict_ignores_other_params() {
        let err = resolve(&[("ssl", "true"), ("sslmode", "disable"), ("sslcert", "/c.pem")]).unwrap_err();
        assert!(matches!(err, GatewayError::ConflictingSslConfig(_)));
    }

    #[test]
    fn test_mode_short_circuits() {
        assert_eq!(resolve(&[("sslmode", "disable")]).unwrap(), Some(SslPolicy::Disabled));
        assert_eq!(
            resolve(&[("sslmode", "no-verify")]).unwrap(),
            Some(SslPolicy::reject_unauthorized(false))
        );
        assert_eq!(
            resolve(&[("sslmode", "verify")]).unwrap(),
            Some(SslPolicy::reject_unauthorized(true))
        );
    }

    #[test]
    fn test_require_without_materials_is_insecure() {
        assert_eq!(
            resolve(&[("sslmode", "require")]).unwrap(),
            Some(SslPolicy::reject_unauthorized(false))
        );
    }

    #[test]
    fn test_prefer_is_insecure() {
        assert_eq!(
            resolve(&[("sslmode", "prefer")]).unwrap(),
            Some(SslPolicy::reject_unauthorized(false))
        );
    }

    #[test]
    fn test_require_with_root_cert_verifies() {
        let policy = resolve(&[("sslmode", "require"), ("sslrootcert", "/root.crt")])
            .unwrap()
            .unwrap();
        let expected = SslPolicy::Enabled(SslOptions {
            ca: Some("/root.crt".into()),
            ..Default::default()
        });
        assert_eq!(policy, expected);
        assert!(policy.options().unwrap().verifies_certificates());
    }

    #[test]
    fn test_no_verify_with_materials_keeps_materials() {
        let policy = resolve(&[
            ("sslmode", "no-verify"),
            ("sslcert", "/client.crt"),
            ("sslkey", "/client.key"),
        ])
        .unwrap();
        assert_eq!(
            policy,
            Some(SslPolicy::Enabled(SslOptions {
                reject_unauthorized: Some(false),
                cert: Some("/client.crt".into()),
                key: Some("/client.key".into()),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_materials_without_mode() {
        let policy = resolve(&[("sslservername", "db.example.com"), ("sslpassword", "pw")]).unwrap();
        assert_eq!(
            policy,
            Some(SslPolicy::Enabled(SslOptions {
                passphrase: Some("pw".into()),
                servername: Some("db.example.com".into()),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_unknown_mode_falls_through_to_composite() {
        assert_eq!(resolve(&[("sslmode", "verify-full")]).unwrap(), Some(SslPolicy::implicit()));
    }

    #[test]
    fn test_plain_ssl_flag() {
        assert_eq!(resolve(&[("ssl", "1")]).unwrap(), Some(SslPolicy::implicit()));
        assert_eq!(resolve(&[("ssl", "TRUE")]).unwrap(), Some(SslPolicy::implicit()));
        assert_eq!(resolve(&[("ssl", "0")]).unwrap(), Some(SslPolicy::Disabled));
        assert_eq!(resolve(&[("ssl", "False")]).unwrap(), Some(SslPolicy::Disabled));
        assert_eq!(resolve(&[("ssl", "yes")]).unwrap(), None);
        assert_eq!(resolve(&[]).unwrap(), None);
    }

    #[test]
    fn test_sslmode_takes_precedence_over_ssl_flag() {
        assert_eq!(
            resolve(&[("ssl", "true"), ("sslmode", "disable")]).unwrap(),
            Some(SslPolicy::Disabled)
        );
    }

    #[test]
    fn test_empty_values_are_absent() {
        assert_eq!(resolve(&[("sslmode", ""), ("sslcert", "")]).unwrap(), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let params = UrlParams::from_pairs([("sslmode", "verify"), ("sslmode", "disable")]);
        assert_eq!(params.get("sslmode"), Some("verify"));
    }
}
