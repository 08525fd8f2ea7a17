//! Supported currencies and free-text currency resolution.

use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;

use crate::{
    domain::CurrencyCode,
    errors::{Error, ParseError},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CurrencyDefinition {
    pub code: String,
    /// Full display name ("Американский доллар").
    pub name: String,
    /// Short name used in help output ("доллар").
    pub short: String,
    /// Lower-case word root matched as a substring of user input ("доллар").
    pub root: String,
}

impl CurrencyDefinition {
    fn new(code: &str, name: &str, short: &str, root: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            short: short.to_string(),
            root: root.to_string(),
        }
    }
}

/// Ordered, immutable list of supported currencies.
///
/// Declaration order matters: when several roots match a token, the first wins.
#[derive(Clone, Debug)]
pub struct Catalog {
    entries: Vec<CurrencyDefinition>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            entries: vec![
                CurrencyDefinition::new("RUB", "Российский рубль", "рубль", "рубл"),
                CurrencyDefinition::new("USD", "Американский доллар", "доллар", "доллар"),
                CurrencyDefinition::new("EUR", "Евро", "евро", "евро"),
                CurrencyDefinition::new("GBP", "Фунт стерлинга", "фунт", "фунт"),
                CurrencyDefinition::new("CNY", "Китайский юань", "юань", "юан"),
                CurrencyDefinition::new("JPY", "Японская йена", "йена", "йен"),
                CurrencyDefinition::new("TRY", "Турецкая лира", "лира", "лир"),
                CurrencyDefinition::new("AMD", "Армянский драм", "драм", "драм"),
                CurrencyDefinition::new("ARS", "Аргентинское песо", "песо", "песо"),
            ],
        }
    }
}

impl Catalog {
    /// Build a catalog, normalizing case and rejecting duplicates or empty roots.
    pub fn new(entries: Vec<CurrencyDefinition>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Config("currency catalog is empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(entries.len());
        for mut def in entries {
            def.code = def.code.trim().to_uppercase();
            def.root = def.root.trim().to_lowercase();
            if def.code.is_empty() {
                return Err(Error::Config("currency code must not be empty".to_string()));
            }
            if def.root.is_empty() {
                return Err(Error::Config(format!(
                    "currency {} has an empty match root",
                    def.code
                )));
            }
            if !seen.insert(def.code.clone()) {
                return Err(Error::Config(format!("duplicate currency code {}", def.code)));
            }
            out.push(def);
        }

        Ok(Self { entries: out })
    }

    /// Load a catalog from a JSON array of `{code, name, short, root}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let entries: Vec<CurrencyDefinition> = serde_json::from_str(&raw)?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[CurrencyDefinition] {
        &self.entries
    }

    pub fn get(&self, code: &CurrencyCode) -> Option<&CurrencyDefinition> {
        self.entries.iter().find(|d| d.code == code.as_str())
    }

    /// Map a free-text token to a canonical code.
    ///
    /// Exact code match (case-insensitive) takes precedence over root matching.
    pub fn resolve(&self, token: &str) -> std::result::Result<CurrencyCode, ParseError> {
        let lower = token.to_lowercase();

        if let Some(def) = self
            .entries
            .iter()
            .find(|d| d.code.to_lowercase() == lower)
        {
            return Ok(CurrencyCode::new(&def.code));
        }

        self.entries
            .iter()
            .find(|d| lower.contains(&d.root))
            .map(|d| CurrencyCode::new(&d.code))
            .ok_or_else(|| ParseError::UnknownCurrency {
                token: token.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(c: &Catalog, t: &str) -> String {
        c.resolve(t).unwrap().to_string()
    }

    #[test]
    fn resolves_codes_in_any_case() {
        let c = Catalog::default();
        assert_eq!(code(&c, "usd"), "USD");
        assert_eq!(code(&c, "USD"), "USD");
        assert_eq!(code(&c, "Eur"), "EUR");
        for def in c.entries() {
            assert_eq!(code(&c, &def.code.to_lowercase()), def.code);
        }
    }

    #[test]
    fn resolves_inflected_names_by_root() {
        let c = Catalog::default();
        assert_eq!(code(&c, "доллар"), "USD");
        assert_eq!(code(&c, "долларов"), "USD");
        assert_eq!(code(&c, "Рубли"), "RUB");
        assert_eq!(code(&c, "рублей"), "RUB");
        assert_eq!(code(&c, "юаней"), "CNY");
        assert_eq!(code(&c, "лиры"), "TRY");
    }

    #[test]
    fn unknown_token_is_rejected_with_original_text() {
        let c = Catalog::default();
        assert_eq!(
            c.resolve("Тугрик"),
            Err(ParseError::UnknownCurrency {
                token: "Тугрик".to_string()
            })
        );
    }

    #[test]
    fn overlapping_roots_resolve_by_declaration_order() {
        let c = Catalog::new(vec![
            CurrencyDefinition::new("AAA", "a", "a", "ab"),
            CurrencyDefinition::new("BBB", "b", "b", "abc"),
        ])
        .unwrap();
        assert_eq!(code(&c, "xabcx"), "AAA");
    }

    #[test]
    fn exact_code_beats_earlier_root() {
        let c = Catalog::new(vec![
            CurrencyDefinition::new("XXX", "x", "x", "usd"),
            CurrencyDefinition::new("USD", "u", "u", "dollar"),
        ])
        .unwrap();
        assert_eq!(code(&c, "usd"), "USD");
    }

    #[test]
    fn new_normalizes_and_validates() {
        let c = Catalog::new(vec![CurrencyDefinition::new("usd", "u", "u", "DOLL")]).unwrap();
        assert_eq!(c.entries()[0].code, "USD");
        assert_eq!(c.entries()[0].root, "doll");

        assert!(Catalog::new(vec![]).is_err());
        assert!(Catalog::new(vec![CurrencyDefinition::new("USD", "u", "u", " ")]).is_err());
        assert!(Catalog::new(vec![
            CurrencyDefinition::new("USD", "u", "u", "a"),
            CurrencyDefinition::new("usd", "u", "u", "b"),
        ])
        .is_err());
    }

    #[test]
    fn loads_catalog_from_json() {
        let path = std::env::temp_dir().join(format!("fxb-catalog-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"[{"code":"chf","name":"Швейцарский франк","short":"франк","root":"франк"}]"#,
        )
        .unwrap();

        let c = Catalog::from_json_file(&path).unwrap();
        assert_eq!(code(&c, "франков"), "CHF");
        assert!(c.get(&CurrencyCode::new("CHF")).is_some());

        let _ = fs::remove_file(&path);
    }
}
