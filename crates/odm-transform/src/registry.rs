//! Code-list deduplication across variables.
//!
//! Many variables share byte-identical value lists. The registry stores one
//! [`CodeList`] per distinct (English, German) mapping pair and records every
//! variable name that uses it. Lookup is through a content fingerprint, so
//! registering n variables stays linear instead of scanning all prior lists.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::value_labels::ValueLabels;

/// A deduplicated code list: a monotonically assigned number, the variables
/// that share it, and the English and German code-to-label mappings. At most
/// one of the mappings may be empty.
#[derive(Debug, Clone)]
pub struct CodeList {
    pub number: u32,
    pub names: Vec<String>,
    pub en: ValueLabels,
    pub de: ValueLabels,
}

/// DataType of a code list as emitted in ODM: `"integer"` when every code in
/// both languages parses as an integer, `"string"` otherwise.
pub fn datatype_of(list: &CodeList) -> &'static str {
    let all_integer = list
        .de
        .keys()
        .chain(list.en.keys())
        .all(|code| code.parse::<i64>().is_ok());
    if all_integer { "integer" } else { "string" }
}

/// Content fingerprint of a canonicalized (English, German) mapping pair.
/// Entries are sorted by code and length-prefixed so distinct pairs cannot
/// collide through delimiter reuse.
fn fingerprint(en: &ValueLabels, de: &ValueLabels) -> String {
    let mut hasher = Sha256::new();
    for labels in [en, de] {
        let mut entries: Vec<(&String, &String)> = labels.iter().collect();
        entries.sort();
        hasher.update(u64::try_from(entries.len()).unwrap_or(u64::MAX).to_be_bytes());
        for (code, label) in entries {
            hasher.update(u64::try_from(code.len()).unwrap_or(u64::MAX).to_be_bytes());
            hasher.update(code.as_bytes());
            hasher.update(u64::try_from(label.len()).unwrap_or(u64::MAX).to_be_bytes());
            hasher.update(label.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct CodeListRegistry {
    lists: Vec<CodeList>,
    by_fingerprint: HashMap<String, usize>,
    by_variable: HashMap<String, usize>,
}

impl CodeListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the parsed value lists of one variable. Registering two
    /// variables with equal mapping pairs merges them into one list; a pair
    /// of empty mappings is a no-op.
    pub fn register(&mut self, variable: &str, en: ValueLabels, de: ValueLabels) {
        if en.is_empty() && de.is_empty() {
            return;
        }
        let key = fingerprint(&en, &de);
        let slot = match self.by_fingerprint.get(&key) {
            Some(&slot) => {
                self.lists[slot].names.push(variable.to_string());
                slot
            }
            None => {
                let slot = self.lists.len();
                let number = u32::try_from(slot).unwrap_or(u32::MAX) + 1;
                self.lists.push(CodeList {
                    number,
                    names: vec![variable.to_string()],
                    en,
                    de,
                });
                self.by_fingerprint.insert(key, slot);
                slot
            }
        };
        // A variable keeps its first list if registered twice.
        self.by_variable
            .entry(variable.to_string())
            .or_insert(slot);
    }

    /// The code list a variable belongs to, if any.
    pub fn find_by_variable(&self, variable: &str) -> Option<&CodeList> {
        self.by_variable
            .get(variable)
            .map(|&slot| &self.lists[slot])
    }

    /// The code list with the given number.
    pub fn get(&self, number: u32) -> Option<&CodeList> {
        let slot = usize::try_from(number).ok()?.checked_sub(1)?;
        self.lists.get(slot)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_labels::parse_value_labels;

    fn labels(raw: &str) -> ValueLabels {
        parse_value_labels(Some(raw))
    }

    #[test]
    fn identical_pairs_merge_into_one_list() {
        let mut registry = CodeListRegistry::new();
        registry.register("sex_1", labels("1=male|2=female"), labels("1=m|2=w"));
        registry.register("sex_2", labels("1=male|2=female"), labels("1=m|2=w"));

        assert_eq!(registry.len(), 1);
        let list = registry.find_by_variable("sex_2").expect("list found");
        assert_eq!(list.names, vec!["sex_1", "sex_2"]);
        assert_eq!(list.number, 1);
    }

    #[test]
    fn equality_ignores_entry_order() {
        let mut registry = CodeListRegistry::new();
        registry.register("a", labels("1=x|2=y"), ValueLabels::new());
        registry.register("b", labels("2=y|1=x"), ValueLabels::new());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn differing_german_map_forces_new_list() {
        let mut registry = CodeListRegistry::new();
        registry.register("a", labels("1=yes"), labels("1=ja"));
        registry.register("b", labels("1=yes"), labels("1=doch"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_by_variable("b").map(|l| l.number), Some(2));
    }

    #[test]
    fn empty_pair_is_a_no_op() {
        let mut registry = CodeListRegistry::new();
        registry.register("a", ValueLabels::new(), ValueLabels::new());
        assert!(registry.is_empty());
        assert!(registry.find_by_variable("a").is_none());
    }

    #[test]
    fn numbers_are_monotonic() {
        let mut registry = CodeListRegistry::new();
        registry.register("a", labels("1=x"), ValueLabels::new());
        registry.register("b", labels("2=y"), ValueLabels::new());
        registry.register("c", labels("3=z"), ValueLabels::new());
        assert_eq!(registry.get(2).map(|l| l.names[0].as_str()), Some("b"));
        assert_eq!(registry.find_by_variable("c").map(|l| l.number), Some(3));
    }

    #[test]
    fn datatype_checks_both_languages() {
        let mut registry = CodeListRegistry::new();
        registry.register("a", labels("1=x|2=y"), labels("1=a|2=b"));
        registry.register("b", labels("1=x"), labels("X1=a"));
        registry.register("c", labels("A=x"), ValueLabels::new());

        assert_eq!(datatype_of(registry.find_by_variable("a").unwrap()), "integer");
        assert_eq!(datatype_of(registry.find_by_variable("b").unwrap()), "string");
        assert_eq!(datatype_of(registry.find_by_variable("c").unwrap()), "string");
    }
}
