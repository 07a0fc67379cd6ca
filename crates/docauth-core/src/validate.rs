//! Rule validation of an extracted document against a rule set.
//!
//! Every rule is evaluated; failures accumulate into one ordered error list.
//! Image rules compare hash sets (required must be a subset of found, extra
//! images are fine). Text rules run in config order against page one.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::models::{DocumentRecord, ValidationConfig};
use crate::text::normalize;

/// Verdict of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Human-readable rule failures, in evaluation order.
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A single rule failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFailure {
    /// A required image hash is absent from the document.
    MissingImage(String),
    /// Page one has no text while texts are required.
    NoPageText,
    /// A required snippet is absent from page one.
    MissingText(String),
}

impl std::fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleFailure::MissingImage(hash) => write!(
                f,
                "Error de imagen: El hash requerido '{}' no fue encontrado.",
                hash
            ),
            RuleFailure::NoPageText => write!(
                f,
                "Error de texto: No se encontró texto en la 'pagina_1' del documento."
            ),
            RuleFailure::MissingText(text) => write!(
                f,
                "Error de texto: La cadena obligatoria '{}' no se encontró en la página 1.",
                text
            ),
        }
    }
}

/// Validate `record` against `config`.
pub fn validate(record: &DocumentRecord, config: &ValidationConfig) -> ValidationOutcome {
    let failures: Vec<RuleFailure> = check_images(record, config)
        .into_iter()
        .chain(check_texts(record, config))
        .collect();

    for failure in &failures {
        debug!("Rule failed: {:?}", failure);
    }
    info!(
        "Validated {} against {} image and {} text rules: {} failures",
        record.filename,
        config.required_images.len(),
        config.required_texts.len(),
        failures.len()
    );

    ValidationOutcome {
        errors: failures.iter().map(ToString::to_string).collect(),
    }
}

/// Required hashes not present among the document's images, sorted.
pub fn check_images(record: &DocumentRecord, config: &ValidationConfig) -> Vec<RuleFailure> {
    let required: BTreeSet<&str> = config
        .required_images
        .iter()
        .map(|image| image.hash_sha256.as_str())
        .collect();
    let found: BTreeSet<&str> = record
        .images
        .iter()
        .map(|image| image.hash_sha256.as_str())
        .collect();

    required
        .difference(&found)
        .map(|hash| RuleFailure::MissingImage(hash.to_string()))
        .collect()
}

/// Required snippets missing from the normalized text of page one.
pub fn check_texts(record: &DocumentRecord, config: &ValidationConfig) -> Vec<RuleFailure> {
    if config.required_texts.is_empty() {
        return Vec::new();
    }

    let page_text = normalize(record.page_text(1));
    if page_text.is_empty() {
        return vec![RuleFailure::NoPageText];
    }

    config
        .required_texts
        .iter()
        .filter(|text| !page_text.contains(normalize(text.as_str()).as_str()))
        .map(|text| RuleFailure::MissingText(text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRecord;
    use pretty_assertions::assert_eq;

    fn record(hashes: &[&str], page_one: Option<&str>) -> DocumentRecord {
        let mut record = DocumentRecord::new("doc.pdf", "doc.pdf");
        if let Some(text) = page_one {
            record.set_page_text(1, text);
        }
        for hash in hashes {
            record.push_image(ImageRecord {
                hash_sha256: hash.to_string(),
                ..Default::default()
            });
        }
        record
    }

    #[test]
    fn test_empty_config_is_valid() {
        let outcome = validate(&record(&[], None), &ValidationConfig::default());
        assert!(outcome.is_valid());
        assert!(outcome.errors.is_empty());

        let outcome = validate(&record(&["x"], Some("anything")), &ValidationConfig::default());
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_subset_is_valid() {
        let config = ValidationConfig::default()
            .with_image("aaa")
            .with_text("contract  TERMS");
        let doc = record(&["aaa", "extra"], Some("This is the\nContract Terms page."));
        assert!(validate(&doc, &config).is_valid());
    }

    #[test]
    fn test_collect_all_semantics() {
        let config = ValidationConfig::default()
            .with_image("aaa")
            .with_image("bbb")
            .with_text("hello");
        let doc = record(&["aaa"], Some("HELLO world"));

        let outcome = validate(&doc, &config);
        assert!(!outcome.is_valid());
        assert_eq!(
            outcome.errors,
            vec!["Error de imagen: El hash requerido 'bbb' no fue encontrado.".to_string()]
        );
    }

    #[test]
    fn test_missing_hashes_sorted_and_deduplicated() {
        let config = ValidationConfig::default()
            .with_image("ccc")
            .with_image("aaa")
            .with_image("ccc");
        let failures = check_images(&record(&[], None), &config);
        assert_eq!(
            failures,
            vec![
                RuleFailure::MissingImage("aaa".into()),
                RuleFailure::MissingImage("ccc".into()),
            ]
        );
    }

    #[test]
    fn test_no_page_text_reported_once() {
        let config = ValidationConfig::default().with_text("uno").with_text("dos");

        for doc in [record(&[], None), record(&[], Some(" \n\t "))] {
            assert_eq!(check_texts(&doc, &config), vec![RuleFailure::NoPageText]);
        }
    }

    #[test]
    fn test_missing_texts_keep_config_order() {
        let config = ValidationConfig::default()
            .with_text("Zeta")
            .with_text("present")
            .with_text("Alfa");
        let doc = record(&[], Some("Only PRESENT here"));

        let outcome = validate(&doc, &config);
        assert_eq!(
            outcome.errors,
            vec![
                "Error de texto: La cadena obligatoria 'Zeta' no se encontró en la página 1.".to_string(),
                "Error de texto: La cadena obligatoria 'Alfa' no se encontró en la página 1.".to_string(),
            ]
        );
    }

    #[test]
    fn test_image_errors_precede_text_errors() {
        let config = ValidationConfig::default().with_text("missing").with_image("h1");
        let outcome = validate(&record(&[], Some("some text")), &config);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].starts_with("Error de imagen"));
        assert!(outcome.errors[1].starts_with("Error de texto"));
    }

    #[test]
    fn test_only_page_one_is_searched() {
        let config = ValidationConfig::default().with_text("second page");
        let mut doc = record(&[], Some("first page"));
        doc.set_page_text(2, "second page");

        assert_eq!(
            check_texts(&doc, &config),
            vec![RuleFailure::MissingText("second page".into())]
        );
    }
}
