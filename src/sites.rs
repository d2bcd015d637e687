/// Site identifiers accepted by the NWIS services.
///
/// USGS surface-water sites use 8-digit codes; groundwater and some
/// special-purpose sites use 15-digit codes built from latitude/longitude.
/// Anything else is rejected before a request is sent, since the NWIS API
/// silently drops unknown codes from its response.

use serde::Deserialize;

use crate::model::NwisError;

/// Returns `true` if `code` is exactly 8 or 15 ASCII digits.
pub fn is_valid_site_code(code: &str) -> bool {
    matches!(code.len(), 8 | 15) && code.bytes().all(|b| b.is_ascii_digit())
}

/// Validates every code and returns them de-duplicated, first occurrence
/// first. This order becomes the site axis of the assembled result.
pub fn normalize_sites<I, S>(sites: I) -> Result<Vec<String>, NwisError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut codes: Vec<String> = Vec::new();
    for site in sites {
        let code = site.as_ref();
        if !is_valid_site_code(code) {
            return Err(NwisError::InvalidInput(format!(
                "site code '{}' must be exactly 8 or 15 digits",
                code
            )));
        }
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
    }
    if codes.is_empty() {
        return Err(NwisError::InvalidInput(
            "at least one site code is required".to_string(),
        ));
    }
    Ok(codes)
}

/// One site code or a list of them, as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SiteList {
    One(String),
    Many(Vec<String>),
}

impl SiteList {
    pub fn codes(&self) -> Vec<&str> {
        match self {
            SiteList::One(code) => vec![code.as_str()],
            SiteList::Many(codes) => codes.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for SiteList {
    fn from(code: &str) -> Self {
        SiteList::One(code.to_string())
    }
}

impl From<Vec<String>> for SiteList {
    fn from(codes: Vec<String>) -> Self {
        SiteList::Many(codes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eight_digit_surface_water_code_is_valid() {
        assert!(is_valid_site_code("03339000"));
        assert!(is_valid_site_code("05568500"));
    }

    #[test]
    fn test_fifteen_digit_code_is_valid() {
        assert!(is_valid_site_code("401733105392404"));
    }

    #[test]
    fn test_wrong_length_codes_are_rejected() {
        assert!(!is_valid_site_code("033390001")); // 9 digits
        assert!(!is_valid_site_code("0333900")); // 7 digits
        assert!(!is_valid_site_code(""));
        assert!(!is_valid_site_code("4017331053924040")); // 16 digits
    }

    #[test]
    fn test_non_numeric_codes_are_rejected() {
        assert!(!is_valid_site_code("invalid_site"));
        assert!(!is_valid_site_code("0333900A"));
        // Non-ASCII digits must not sneak through a char-based check.
        assert!(!is_valid_site_code("０３３３９０００"));
    }

    #[test]
    fn test_normalize_keeps_first_occurrence_order() {
        let codes = normalize_sites(["05568500", "03339000", "05568500"]).unwrap();
        assert_eq!(codes, vec!["05568500".to_string(), "03339000".to_string()]);
    }

    #[test]
    fn test_normalize_rejects_any_bad_code() {
        let err = normalize_sites(["03339000", "033390001"]).unwrap_err();
        assert!(matches!(err, NwisError::InvalidInput(_)));
        assert!(err.to_string().contains("033390001"));
    }

    #[test]
    fn test_padded_codes_are_rejected() {
        for padded in [" 03339000", "03339000\t", " 03339000\t"] {
            assert!(
                matches!(normalize_sites([padded]), Err(NwisError::InvalidInput(_))),
                "{:?} should be rejected",
                padded
            );
        }
    }

    #[test]
    fn test_normalize_rejects_empty_list() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            normalize_sites(empty),
            Err(NwisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_site_list_accepts_string_or_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            sites: SiteList,
        }

        let one: Wrapper = toml::from_str(r#"sites = "03339000""#).unwrap();
        assert_eq!(one.sites.codes(), vec!["03339000"]);

        let many: Wrapper = toml::from_str(r#"sites = ["03339000", "05568500"]"#).unwrap();
        assert_eq!(many.sites.codes(), vec!["03339000", "05568500"]);
    }
}
