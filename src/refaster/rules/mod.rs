//! The bundled template rules, grouped by the API they canonicalise.

use once_cell::sync::Lazy;

use crate::errors::RectifyError;
use crate::refaster::TemplateRule;

mod equality;
mod mockito;
mod stream;

static CATALOG: Lazy<Vec<TemplateRule>> =
    Lazy::new(|| build_catalog().expect("bundled template rules are well formed"));

/// All bundled rules, built once.
pub fn catalog() -> &'static [TemplateRule] {
    &CATALOG
}

/// Builds the bundled rules, reporting the first definition error.
pub fn build_catalog() -> Result<Vec<TemplateRule>, RectifyError> {
    let mut rules = mockito::rules()?;
    rules.extend(stream::rules()?);
    rules.extend(equality::rules()?);
    Ok(rules)
}

pub fn find(name: &str) -> Option<&'static TemplateRule> {
    catalog().iter().find(|rule| rule.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_rules_are_well_formed_and_uniquely_named() {
        let rules = build_catalog().unwrap();
        let mut names: Vec<&str> = rules.iter().map(TemplateRule::name).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(count, 32);
        assert!(find("StreamRules.Joining").is_some());
        assert!(find("StreamRules.Missing").is_none());
    }
}
