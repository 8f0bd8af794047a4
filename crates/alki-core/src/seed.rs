//! Built-in seed items and default naming
//!
//! The seed set is what the editor shows when the remote collection cannot
//! be reached (or returns nothing), so the session is always usable.

use crate::models::Item;

/// Prefix for synthesized item names
pub const DEFAULT_NAME_PREFIX: &str = "UI Asset ";

/// Category given to items created without one
pub const DEFAULT_KIND: &str = "UI";

const POTION_CSS: &str = r#".potion-btn {
  padding: 12px 24px;
  background: #ff7675;
  color: white;
  border: 4px solid #d63031;
  border-radius: 4px;
  font-family: sans-serif;
  font-weight: bold;
  cursor: pointer;
  box-shadow: 0 4px 0 #d63031;
}
.potion-btn:active {
  transform: translateY(2px);
  box-shadow: 0 2px 0 #d63031;
}"#;

const LEMON_CSS: &str = r#".lemon-loader {
  width: 40px;
  height: 40px;
  border: 4px solid #ffe66d;
  border-top: 4px solid transparent;
  border-radius: 50%;
  animation: spin 1s linear infinite;
}
@keyframes spin { 0% { transform: rotate(0deg); } 100% { transform: rotate(360deg); } }"#;

/// The built-in fallback collection
pub fn seed_items() -> Vec<Item> {
    vec![
        Item::new("1", "Super Potion")
            .with_kind("UI Component")
            .with_sources(
                r#"<button class="potion-btn">Heal 50HP</button>"#,
                POTION_CSS,
                "document.querySelector('.potion-btn').onclick = () => console.log('HP Restored!');",
            ),
        Item::new("2", "Lemonade")
            .with_kind("Beverage")
            .with_sources(r#"<div class="lemon-loader"></div>"#, LEMON_CSS, ""),
    ]
}

/// Synthesize the next free placeholder name
///
/// Scans names of the form `"UI Asset <n>"` and returns the prefix with one
/// more than the largest `n` found (or 1). The suffix is read like an integer
/// parse: leading whitespace and a `+` sign are accepted and trailing
/// non-digits are ignored.
pub fn default_name(items: &[Item]) -> String {
    let max = items
        .iter()
        .filter_map(|item| item.name.strip_prefix(DEFAULT_NAME_PREFIX))
        .filter_map(leading_number)
        .max()
        .unwrap_or(0);

    format!("{}{}", DEFAULT_NAME_PREFIX, max.saturating_add(1))
}

fn leading_number(s: &str) -> Option<u64> {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(names: &[&str]) -> Vec<Item> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Item::new(i.to_string(), *n))
            .collect()
    }

    #[test]
    fn test_seed_items() {
        let seed = seed_items();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].id.as_str(), "1");
        assert_eq!(seed[0].name, "Super Potion");
        assert_eq!(seed[1].name, "Lemonade");
        assert!(seed.iter().all(|item| item.all.is_empty()));
        assert!(seed[1].js.is_empty());
    }

    #[test]
    fn test_default_name_empty_collection() {
        assert_eq!(default_name(&[]), "UI Asset 1");
        assert_eq!(default_name(&seed_items()), "UI Asset 1");
    }

    #[test]
    fn test_default_name_uses_max_suffix() {
        let items = named(&["UI Asset 1", "UI Asset 3"]);
        assert_eq!(default_name(&items), "UI Asset 4");
    }

    #[test]
    fn test_default_name_ignores_non_numeric() {
        let items = named(&["UI Asset x", "UI Asset ", "UI Assets 9", "ui asset 5"]);
        assert_eq!(default_name(&items), "UI Asset 1");
    }

    #[test]
    fn test_default_name_reads_leading_digits() {
        let items = named(&["UI Asset 12b", "UI Asset  4", "UI Asset -20"]);
        assert_eq!(default_name(&items), "UI Asset 13");
    }
}
