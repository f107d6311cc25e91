//! Application configuration: station variants, suggestion lists and asset
//! sources. Everything here ships with compiled-in defaults so the app runs
//! without a config file; a `permit-pdf.toml` overrides any section.

use serde::Deserialize;
use std::path::Path;

/// The two destination container stations a permit can be issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationVariant {
    Gemini,
    Choice,
}

impl StationVariant {
    /// Menu label in the shell sidebar.
    pub fn label(&self) -> &'static str {
        match self {
            StationVariant::Gemini => "GEMINI PTT",
            StationVariant::Choice => "CHOICE PTT",
        }
    }

    /// All variants in sidebar order.
    pub fn all() -> &'static [StationVariant] {
        &[StationVariant::Gemini, StationVariant::Choice]
    }
}

/// Per-station constants substituted into the document template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StationConfig {
    /// Full company name of the receiving container station.
    pub name: String,
    /// Four-letter customs firms code.
    pub firms_code: String,
    /// Street address printed in the delivery footer.
    pub address: String,
    /// Short tag used in derived filenames.
    pub tag: String,
}

/// Fixed option lists offered as type-ahead suggestions on the form.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Suggestions {
    pub origins: Vec<String>,
    pub truckers: Vec<String>,
    pub consignors: Vec<String>,
}

impl Default for Suggestions {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Suggestions {
            origins: list(&[
                "ANA ORD",
                "CARGOLUX ORD",
                "CHINA AIRLINES ORD",
                "EVA AIR ORD",
                "KOREAN AIR ORD",
                "POLAR AIR ORD",
            ]),
            truckers: list(&[
                "AGI TRUCKING",
                "FLS TRANSPORT",
                "HAI CARGO EXPRESS",
                "MID-WEST TRANSFER",
                "TAZ TRUCKING",
            ]),
            consignors: list(&[
                "APEX LOGISTICS INTL",
                "DIMERCO EXPRESS",
                "HONOUR LANE SHIPPING",
                "MORRISON EXPRESS",
                "TOPOCEAN CONSOLIDATION",
            ]),
        }
    }
}

/// Where the rasterizer finds its fonts and header/signature artwork.
/// Image sources may be `http(s)` URLs or local file paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetSources {
    pub font: Option<String>,
    pub font_bold: Option<String>,
    pub logo: Option<String>,
    pub signature: Option<String>,
}

impl Default for AssetSources {
    fn default() -> Self {
        AssetSources {
            font: None,
            font_bold: None,
            logo: Some(
                "https://raw.githubusercontent.com/jun2369/MAWBchangenew/main/docs/c589ac709a4e12b3ba645999c32659e.png"
                    .to_string(),
            ),
            signature: Some(
                "https://raw.githubusercontent.com/jun2369/MAWBchangenew/main/docs/b134b076058df762f53148378855766.png"
                    .to_string(),
            ),
        }
    }
}

/// Top-level configuration record.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: StationConfig,
    pub choice: StationConfig,
    pub suggestions: Suggestions,
    pub assets: AssetSources,
    /// Where exported PDFs (and fallback pages) are written.
    pub out_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            gemini: StationConfig {
                name: "GEMINI EXPRESS TRANSPORT CORP.".to_string(),
                firms_code: "HBT1".to_string(),
                address: "2701 BUSSE ROAD, Elk Grove, IL 60007".to_string(),
                tag: "GEMINI".to_string(),
            },
            choice: StationConfig {
                name: "CHOICE AIR CARGO SERVICES CORP.".to_string(),
                firms_code: "JCH5".to_string(),
                address: "966 TOUHY AVE, Elk Grove Village, IL 60007".to_string(),
                tag: "CHOICE".to_string(),
            },
            suggestions: Suggestions::default(),
            assets: AssetSources::default(),
            out_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, falling back to the defaults with a
    /// logged warning when the file is missing or unparsable.
    pub fn load(path: Option<&Path>) -> AppConfig {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Path::new("permit-pdf.toml").to_path_buf(),
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("Could not parse {}: {}. Using defaults.", path.display(), e);
                    AppConfig::default()
                }
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not read {}: {}. Using defaults.", path.display(), e);
                }
                AppConfig::default()
            }
        }
    }

    pub fn station(&self, variant: StationVariant) -> &StationConfig {
        match variant {
            StationVariant::Gemini => &self.gemini,
            StationVariant::Choice => &self.choice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_both_stations() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.station(StationVariant::Gemini).firms_code, "HBT1");
        assert_eq!(cfg.station(StationVariant::Choice).tag, "CHOICE");
        assert!(!cfg.suggestions.truckers.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [gemini]
            name = "GEMINI EXPRESS TRANSPORT CORP."
            firms_code = "ZZZ9"
            address = "1 TEST RD"
            tag = "GEMINI"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gemini.firms_code, "ZZZ9");
        assert_eq!(cfg.choice.tag, "CHOICE");
        assert!(cfg.assets.logo.is_some());
    }
}
