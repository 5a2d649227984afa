use regex::Regex;
use std::sync::OnceLock;

/// Substrings that mark a listing as something other than a standalone game.
/// Matching is done on the lowercased name, so "Boost" or "Ghost" are rejected
/// too; losing a real game is preferred over ingesting an add-on.
const NON_GAME_MARKERS: [&str; 6] = ["dlc", "ost", "soundtrack", "demo", "edition", "pack"];

struct TitlePatterns {
    brackets: Regex,
    trademark: Regex,
    disallowed: Regex,
    spaces: Regex,
    parenthetical: Regex,
}

static PATTERNS: OnceLock<TitlePatterns> = OnceLock::new();

fn patterns() -> &'static TitlePatterns {
    PATTERNS.get_or_init(|| TitlePatterns {
        brackets: Regex::new(r"\[.*\]").expect("static regex"),
        trademark: Regex::new(r"\(TM\)").expect("static regex"),
        disallowed: Regex::new(r#"[^a-zA-Z0-9 :\-!$%&'"*+=?^_|.()]"#).expect("static regex"),
        spaces: Regex::new(r" {2,}").expect("static regex"),
        parenthetical: Regex::new(r"\(.*\)").expect("static regex"),
    })
}

/// Canonical display name for a raw storefront title.
///
/// Strips bracketed annotations (`[RU]`), `(TM)` markers and every character
/// outside the display allow-list, then collapses runs of spaces and trims.
pub fn clean_title(raw: &str) -> String {
    let p = patterns();
    let name = p.brackets.replace_all(raw, "");
    let name = p.trademark.replace_all(&name, "");
    let name = p.disallowed.replace_all(&name, "");
    let name = p.spaces.replace_all(&name, " ");
    name.trim().to_string()
}

/// Stable machine token for a genre label: `"Free to Play"` -> `free_to_play`.
pub fn clean_tag(raw: &str) -> String {
    let letters: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();
    letters
        .split_whitespace()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Heuristic filter for names that look like a base game rather than an
/// add-on, soundtrack, demo, bundle or special edition.
pub fn is_likely_base_game(name: &str) -> bool {
    let lower = name.to_lowercase();
    if patterns().parenthetical.is_match(&lower) || lower.contains('/') || lower.contains(" - ") {
        return false;
    }
    !NON_GAME_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Per-storefront variant of the search slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugDialect {
    /// Every space becomes a hyphen, so "a  b" keeps both separators.
    EpicGames,
    /// Runs of whitespace collapse to a single hyphen.
    Gog,
}

/// Lowercase, keep only `[a-z ]`, and join words with hyphens.
pub fn slugify(name: &str, dialect: SlugDialect) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || *c == ' ')
        .collect();
    match dialect {
        SlugDialect::EpicGames => kept.trim().replace(' ', "-"),
        SlugDialect::Gog => kept.split_whitespace().collect::<Vec<_>>().join("-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_strips_annotations_and_symbols() {
        assert_eq!(clean_title("Half-Life 2 [RU]"), "Half-Life 2");
        assert_eq!(clean_title("Portal(TM) 2"), "Portal 2");
        assert_eq!(clean_title("Sid Meier’s Civilization® VI"), "Sid Meiers Civilization VI");
        assert_eq!(clean_title("  DOOM    Eternal  "), "DOOM Eternal");
        assert_eq!(clean_title("Quake: Champions!"), "Quake: Champions!");
    }

    #[test]
    fn clean_title_can_produce_empty_names() {
        assert_eq!(clean_title("[スペシャル]"), "");
        assert_eq!(clean_title("東方紅魔郷"), "");
    }

    #[test]
    fn clean_tag_produces_tokens() {
        assert_eq!(clean_tag("Free to Play"), "free_to_play");
        assert_eq!(clean_tag("Action & Adventure"), "action_adventure");
        assert_eq!(clean_tag(" RPG 2 "), "rpg");
        assert_eq!(clean_tag("Massively Multiplayer"), "massively_multiplayer");
    }

    #[test]
    fn base_game_filter_rejects_add_ons() {
        assert!(is_likely_base_game("Hollow Knight"));
        assert!(is_likely_base_game("Portal 2"));
        for name in [
            "Hollow Knight Soundtrack",
            "Half-Life 2: Episode Two (Beta)",
            "Fallout 3/New Vegas Bundle",
            "Witcher 3 - Blood and Wine",
            "Cities: Skylines DLC",
            "Celeste OST",
            "Hades Demo",
            "Skyrim Special Edition",
            "Sims 4 Expansion Pack",
        ] {
            assert!(!is_likely_base_game(name), "{name} should be rejected");
        }
    }

    #[test]
    fn base_game_filter_is_case_insensitive() {
        assert!(!is_likely_base_game("DOOM DEMO"));
        assert!(!is_likely_base_game("Ghost of a Tale"));
    }

    #[test]
    fn slug_dialects_share_the_transform() {
        assert_eq!(slugify("The Witcher 3: Wild Hunt", SlugDialect::EpicGames), "the-witcher--wild-hunt");
        assert_eq!(slugify("The Witcher 3: Wild Hunt", SlugDialect::Gog), "the-witcher-wild-hunt");
        assert_eq!(slugify("Celeste", SlugDialect::Gog), "celeste");
        assert_eq!(slugify("1942", SlugDialect::EpicGames), "");
    }
}
