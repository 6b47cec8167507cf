use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of upstream catalogs the proxy knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Atut,
    Ramirent,
    Onninen,
}

#[derive(Debug, Error)]
#[error("unknown site \"{0}\"")]
pub struct UnknownSite(pub String);

impl Site {
    pub const ALL: [Site; 3] = [Site::Atut, Site::Ramirent, Site::Onninen];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Site::Atut => "atut",
            Site::Ramirent => "ramirent",
            Site::Onninen => "onninen",
        }
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Site::Atut => "https://www.atutrental.com.pl",
            Site::Ramirent => "https://ramirent.pl",
            Site::Onninen => "https://onninen.pl",
        }
    }

    /// Atut exposes its catalog anonymously only.
    #[must_use]
    pub fn supports_login(self) -> bool {
        !matches!(self, Site::Atut)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atut" | "atutrental" => Ok(Site::Atut),
            "ramirent" => Ok(Site::Ramirent),
            "onninen" => Ok(Site::Onninen),
            _ => Err(UnknownSite(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_sites_case_insensitively() {
        assert_eq!("Ramirent".parse::<Site>().unwrap(), Site::Ramirent);
        assert_eq!("atutrental".parse::<Site>().unwrap(), Site::Atut);
        assert!("castorama".parse::<Site>().is_err());
    }

    #[test]
    fn only_atut_is_anonymous_only() {
        assert!(!Site::Atut.supports_login());
        assert!(Site::Ramirent.supports_login());
        assert!(Site::Onninen.supports_login());
    }

    #[test]
    fn display_matches_path_segment() {
        for site in Site::ALL {
            assert_eq!(site.to_string().parse::<Site>().unwrap(), site);
        }
    }
}
