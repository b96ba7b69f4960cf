//! Keeping adapter trigger words in the prompt in sync with the selection.
//!
//! These are pure functions; the caller owns the previous selection and the
//! prompt text between calls.

use crate::adapters::AdapterCatalog;

/// Prepend trigger words for newly selected adapters.
///
/// When `selected` equals `previous` the prompt is returned untouched.
/// Otherwise every selected adapter's trigger word that does not already
/// appear in the prompt (case-insensitive) is prepended, in slot order.
pub fn reconcile_prompt<S: AsRef<str>>(
    current: &str,
    selected: &[S],
    previous: &[S],
    catalog: &AdapterCatalog,
) -> String {
    let unchanged = selected.len() == previous.len()
        && selected
            .iter()
            .zip(previous)
            .all(|(a, b)| a.as_ref() == b.as_ref());
    if unchanged {
        return current.to_string();
    }

    let lowered = current.to_lowercase();
    let missing: Vec<&str> = selected
        .iter()
        .filter_map(|id| catalog.trigger_word(id.as_ref()))
        .filter(|word| !lowered.contains(&word.to_lowercase()))
        .collect();

    if missing.is_empty() {
        current.to_string()
    } else {
        format!("{} {}", missing.join(" "), current)
    }
}

/// Strip the selected adapters' trigger words from the start of `prompt`.
///
/// Each word is removed at most once, in slot order, with or without a
/// following space. The result is trimmed.
pub fn base_prompt<S: AsRef<str>>(prompt: &str, selected: &[S], catalog: &AdapterCatalog) -> String {
    let mut rest = prompt;
    for word in selected
        .iter()
        .filter_map(|id| catalog.trigger_word(id.as_ref()))
    {
        rest = strip_prefix_ignore_case(rest, &format!("{} ", word))
            .or_else(|| strip_prefix_ignore_case(rest, word))
            .unwrap_or(rest);
    }
    rest.trim().to_string()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENJARONG: &str = "Benjarong_flux_v1.safetensors";
    const SOMTUM: &str = "SomTumThai.safetensors";

    fn catalog() -> AdapterCatalog {
        AdapterCatalog::reference()
    }

    #[test]
    fn test_unchanged_selection_keeps_prompt() {
        let out = reconcile_prompt("a bowl", &[BENJARONG, "None"], &[BENJARONG, "None"], &catalog());
        assert_eq!(out, "a bowl");
    }

    #[test]
    fn test_new_adapter_prepends_trigger_word() {
        let out = reconcile_prompt("a salad on a plate", &[SOMTUM, "None"], &["None", "None"], &catalog());
        assert_eq!(out, "SomTumThai a salad on a plate");
    }

    #[test]
    fn test_existing_trigger_word_not_duplicated() {
        let out = reconcile_prompt(
            "product photo of benjarong ornate designs bowl",
            &[BENJARONG, SOMTUM],
            &["None", "None"],
            &catalog(),
        );
        assert_eq!(out, "SomTumThai product photo of benjarong ornate designs bowl");
    }

    #[test]
    fn test_multiple_trigger_words_in_slot_order() {
        let out = reconcile_prompt("food", &[SOMTUM, BENJARONG], &["None", "None"], &catalog());
        assert_eq!(out, "SomTumThai Benjarong ornate designs food");
    }

    #[test]
    fn test_deselecting_to_none_adds_nothing() {
        let out = reconcile_prompt("food", &["None", "None"], &[SOMTUM, "None"], &catalog());
        assert_eq!(out, "food");
    }

    #[test]
    fn test_base_prompt_strips_leading_trigger_words() {
        let prompt = "SomTumThai Benjarong ornate designs food on a table";
        assert_eq!(
            base_prompt(prompt, &[SOMTUM, BENJARONG], &catalog()),
            "food on a table"
        );
    }

    #[test]
    fn test_base_prompt_is_case_insensitive_and_leaves_inner_words() {
        assert_eq!(
            base_prompt("somtumthai, a plate of SomTumThai", &[SOMTUM], &catalog()),
            ", a plate of SomTumThai"
        );
    }

    #[test]
    fn test_base_prompt_without_adapters() {
        assert_eq!(base_prompt("  plain  ", &["None"], &catalog()), "plain");
    }

    #[test]
    fn test_reconcile_then_base_round_trip() {
        let selected = [BENJARONG, SOMTUM];
        let grown = reconcile_prompt("a kitchen", &selected, &["None", "None"], &catalog());
        assert_eq!(base_prompt(&grown, &selected, &catalog()), "a kitchen");
    }

    #[test]
    fn test_strip_prefix_respects_char_boundaries() {
        assert_eq!(strip_prefix_ignore_case("é", "a"), None);
        assert_eq!(strip_prefix_ignore_case("ab", "abc"), None);
        assert_eq!(strip_prefix_ignore_case("ABc", "ab"), Some("c"));
    }
}
