// src/matching/dictionaries.rs
//! Read-mostly lookup tables used by normalization and the scoring strategies.
//!
//! Each table starts from hardcoded defaults and is optionally layered with a JSON
//! override file. The merged result is immutable; [`DictionaryStore::reload`] builds a
//! fresh [`Dictionaries`] and swaps it in, so readers holding a snapshot are never
//! affected by a reload in progress.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::matching::normalize::normalize_entity_name;
use crate::models::stats_models::DictionarySizes;
use crate::utils::constants::{COMMON_MISTAKES_FILE, COMPANY_ALIASES_FILE, IT_TERMS_FILE};

const DEFAULT_ACRONYMS: &[(&str, &[&str])] = &[
    ("ibm", &["international business machines"]),
    ("hp", &["hewlett packard", "hewlett-packard"]),
    ("hpe", &["hewlett packard enterprise", "hewlett-packard enterprise"]),
    ("aws", &["amazon web services"]),
    ("gcp", &["google cloud platform"]),
    ("msft", &["microsoft"]),
    ("ms", &["microsoft"]),
    ("ge", &["general electric"]),
    ("pwc", &["pricewaterhousecoopers"]),
    ("boa", &["bank of america"]),
    ("bofa", &["bank of america"]),
    ("jpm", &["jp morgan", "jpmorgan"]),
    ("ups", &["united parcel service", "uninterruptible power supply"]),
    ("ad", &["active directory"]),
    ("dc", &["domain controller"]),
    ("dns", &["domain name system"]),
    ("vpn", &["virtual private network"]),
    ("nas", &["network attached storage"]),
    ("san", &["storage area network"]),
    ("msp", &["managed service provider"]),
    ("cpa", &["certified public accountant"]),
];

const DEFAULT_COMMON_MISTAKES: &[(&str, &str)] = &[
    ("pasword", "password"),
    ("passwrod", "password"),
    ("databse", "database"),
    ("netwrok", "network"),
    ("configuraiton", "configuration"),
    ("confguration", "configuration"),
    ("orgnization", "organization"),
    ("organisation", "organization"),
    ("exhange", "exchange"),
    ("activ directory", "active directory"),
    ("fierwall", "firewall"),
    ("firwall", "firewall"),
    ("conection", "connection"),
    ("certficate", "certificate"),
    ("workstaion", "workstation"),
];

const DEFAULT_IT_TERMS: &[&str] = &[
    "active directory",
    "asset",
    "azure",
    "backup",
    "certificate",
    "configuration",
    "contact",
    "database",
    "dhcp",
    "directory",
    "dns",
    "document",
    "domain",
    "exchange",
    "firewall",
    "laptop",
    "license",
    "location",
    "network",
    "office",
    "organization",
    "password",
    "printer",
    "router",
    "server",
    "ssl",
    "storage",
    "switch",
    "vpn",
    "warranty",
    "wireless",
    "workstation",
];

/// Merged, immutable dictionary state.
#[derive(Debug, Clone, Default)]
pub struct Dictionaries {
    pub acronyms: HashMap<String, Vec<String>>,
    pub common_mistakes: BTreeMap<String, String>,
    pub it_terms: BTreeSet<String>,
    /// Normalized input name → normalized aliases.
    pub company_aliases: HashMap<String, Vec<String>>,
    /// `common_mistakes` ordered longest typo first, applied in this order.
    mistake_rules: Vec<(String, String)>,
}

impl Dictionaries {
    /// Hardcoded defaults only.
    pub fn defaults() -> Self {
        Self::merge(None, None, None)
    }

    /// Defaults layered with whatever override files exist in `dir`.
    ///
    /// A missing file is not an error; a malformed one is logged and the defaults
    /// for that dictionary are kept.
    pub fn load(dir: &Path) -> Self {
        let mistakes = load_override::<BTreeMap<String, String>>(&dir.join(COMMON_MISTAKES_FILE));
        let terms = load_override::<Vec<String>>(&dir.join(IT_TERMS_FILE));
        let aliases = load_override::<HashMap<String, Vec<String>>>(&dir.join(COMPANY_ALIASES_FILE));
        Self::merge(mistakes, terms, aliases)
    }

    /// Layer overrides over the defaults: misspellings are overridden per key,
    /// IT terms are unioned, aliases come only from the override.
    pub fn merge(
        mistakes_override: Option<BTreeMap<String, String>>,
        terms_override: Option<Vec<String>>,
        aliases_override: Option<HashMap<String, Vec<String>>>,
    ) -> Self {
        let acronyms = DEFAULT_ACRONYMS
            .iter()
            .map(|(abbr, expansions)| {
                (
                    abbr.to_string(),
                    expansions.iter().map(|e| e.to_string()).collect(),
                )
            })
            .collect();

        let mut common_mistakes: BTreeMap<String, String> = DEFAULT_COMMON_MISTAKES
            .iter()
            .map(|(typo, fix)| (typo.to_string(), fix.to_string()))
            .collect();
        for (typo, fix) in mistakes_override.unwrap_or_default() {
            let typo = typo.trim().to_lowercase();
            let fix = fix.trim().to_lowercase();
            if !typo.is_empty() && typo != fix {
                common_mistakes.insert(typo, fix);
            }
        }

        let mut it_terms: BTreeSet<String> = DEFAULT_IT_TERMS.iter().map(|t| t.to_string()).collect();
        it_terms.extend(
            terms_override
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );

        let mut mistake_rules: Vec<(String, String)> = common_mistakes
            .iter()
            .map(|(typo, fix)| (typo.clone(), fix.clone()))
            .collect();
        mistake_rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let mut company_aliases: HashMap<String, Vec<String>> = HashMap::new();
        for (name, aliases) in aliases_override.unwrap_or_default() {
            let key = normalize_entity_name(&name, &mistake_rules);
            if key.is_empty() {
                continue;
            }
            let entry = company_aliases.entry(key).or_default();
            for alias in aliases {
                let alias = normalize_entity_name(&alias, &mistake_rules);
                if !alias.is_empty() && !entry.contains(&alias) {
                    entry.push(alias);
                }
            }
        }

        Self {
            acronyms,
            common_mistakes,
            it_terms,
            company_aliases,
            mistake_rules,
        }
    }

    pub fn mistake_rules(&self) -> &[(String, String)] {
        &self.mistake_rules
    }

    pub fn sizes(&self) -> DictionarySizes {
        DictionarySizes {
            acronyms: self.acronyms.len(),
            common_mistakes: self.common_mistakes.len(),
            it_terms: self.it_terms.len(),
            company_aliases: self.company_aliases.len(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dictionary file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse dictionary file {}", path.display()))
}

fn load_override<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        debug!("No dictionary override at {}, using defaults", path.display());
        return None;
    }
    match read_json(path) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring dictionary override: {:#}", e);
            None
        }
    }
}

/// Holder for the current [`Dictionaries`] snapshot with copy-and-swap reloads.
pub struct DictionaryStore {
    source_dir: Option<PathBuf>,
    current: RwLock<Arc<Dictionaries>>,
}

impl DictionaryStore {
    /// Store backed by override files in `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dictionaries = Dictionaries::load(&dir);
        Self {
            source_dir: Some(dir),
            current: RwLock::new(Arc::new(dictionaries)),
        }
    }

    /// Store with fixed contents; reloads rebuild from defaults.
    pub fn fixed(dictionaries: Dictionaries) -> Self {
        Self {
            source_dir: None,
            current: RwLock::new(Arc::new(dictionaries)),
        }
    }

    pub fn snapshot(&self) -> Arc<Dictionaries> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Re-read all sources and atomically swap in the merged result.
    pub fn reload(&self) -> DictionarySizes {
        let fresh = match &self.source_dir {
            Some(dir) => Dictionaries::load(dir),
            None => Dictionaries::defaults(),
        };
        let sizes = fresh.sizes();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_dir_falls_back_to_defaults() {
        let dicts = Dictionaries::load(Path::new("/definitely/not/a/real/dir"));
        assert_eq!(dicts.common_mistakes.len(), DEFAULT_COMMON_MISTAKES.len());
        assert!(dicts.it_terms.contains("firewall"));
        assert!(dicts.company_aliases.is_empty());
        assert!(dicts.acronyms.contains_key("ibm"));
    }

    #[test]
    fn test_override_wins_for_mistakes_and_unions_terms() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(COMMON_MISTAKES_FILE),
            r#"{"pasword": "passphrase", "swich": "switch"}"#,
        )
        .unwrap();
        fs::write(dir.path().join(IT_TERMS_FILE), r#"["Hypervisor", "firewall"]"#).unwrap();
        fs::write(
            dir.path().join(COMPANY_ALIASES_FILE),
            r#"{"Big Blue": ["International Business Machines Corporation"]}"#,
        )
        .unwrap();

        let dicts = Dictionaries::load(dir.path());
        assert_eq!(dicts.common_mistakes["pasword"], "passphrase");
        assert_eq!(dicts.common_mistakes["swich"], "switch");
        assert_eq!(dicts.common_mistakes["databse"], "database");
        assert!(dicts.it_terms.contains("hypervisor"));
        assert_eq!(dicts.it_terms.len(), DEFAULT_IT_TERMS.len() + 1);
        assert_eq!(
            dicts.company_aliases["big blue"],
            vec!["international business machines corp".to_string()]
        );
    }

    #[test]
    fn test_malformed_override_keeps_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(COMMON_MISTAKES_FILE), "{not json").unwrap();
        fs::write(dir.path().join(IT_TERMS_FILE), r#"{"wrong": "shape"}"#).unwrap();

        let dicts = Dictionaries::load(dir.path());
        assert_eq!(dicts.common_mistakes.len(), DEFAULT_COMMON_MISTAKES.len());
        assert_eq!(dicts.it_terms.len(), DEFAULT_IT_TERMS.len());
    }

    #[test]
    fn test_mistake_rules_are_longest_first() {
        let dicts = Dictionaries::defaults();
        let lengths: Vec<usize> = dicts.mistake_rules().iter().map(|(t, _)| t.len()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_reload_swaps_without_touching_old_snapshot() {
        let dir = tempdir().unwrap();
        let store = DictionaryStore::from_dir(dir.path());
        let before = store.snapshot();
        assert!(before.company_aliases.is_empty());

        fs::write(
            dir.path().join(COMPANY_ALIASES_FILE),
            r#"{"msft": ["Microsoft Corporation"]}"#,
        )
        .unwrap();
        let sizes = store.reload();

        assert_eq!(sizes.company_aliases, 1);
        assert!(before.company_aliases.is_empty());
        assert_eq!(store.snapshot().company_aliases["msft"], vec!["microsoft corp".to_string()]);
    }
}
