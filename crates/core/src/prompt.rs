//! Prompt construction and the content-policy softening pass.
//!
//! One prompt is built per generation attempt from the style template (or a
//! free-text override) plus the quote text. If the model rejects it on
//! content-policy grounds, [`soften_prompt`] strips a fixed denylist of
//! violent/harmful terms and collapses whitespace; the generator retries
//! exactly once with the softened prompt.

/// Placeholder in style templates that is replaced with the quote text.
const QUOTE_PLACEHOLDER: &str = "{quote}";

/// Appended to every prompt. The artifact must never contain the quote as
/// literal rendered text.
const NO_TEXT_INSTRUCTION: &str =
    "Do not render the quote, any words, letters, or typography in the image.";

/// Terms stripped by the softening pass, matched case-insensitively against
/// whole words.
const SOFTEN_DENYLIST: &[&str] = &[
    "kill", "killed", "killing", "murder", "die", "dies", "died", "dead",
    "death", "blood", "bloody", "gun", "guns", "shoot", "shot", "stab",
    "knife", "weapon", "bomb", "explode", "violence", "violent", "hate",
    "suicide", "corpse",
];

/// Build the generation prompt for a quote.
///
/// `override_description`, when present, replaces the style template
/// entirely (free-text style requests from the picker). Templates may embed
/// `{quote}`; otherwise the quote is appended as an inspiration clause.
pub fn build_prompt(template: &str, override_description: Option<&str>, quote_text: &str) -> String {
    let base = override_description.unwrap_or(template);
    let body = if base.contains(QUOTE_PLACEHOLDER) {
        base.replace(QUOTE_PLACEHOLDER, quote_text)
    } else {
        format!("{base}. Artwork inspired by the quote: \"{quote_text}\".")
    };
    format!("{body} {NO_TEXT_INSTRUCTION}")
}

/// Strip denylisted terms and collapse whitespace.
///
/// Word boundaries are whitespace; surrounding punctuation is ignored for
/// the comparison but preserved words keep their original form.
pub fn soften_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .filter(|word| {
            let bare: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            !SOFTEN_DENYLIST.contains(&bare.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholder_is_substituted() {
        let p = build_prompt("Oil painting of {quote}", None, "a quiet storm");
        assert!(p.starts_with("Oil painting of a quiet storm"));
        assert!(p.ends_with(NO_TEXT_INSTRUCTION));
    }

    #[test]
    fn template_without_placeholder_appends_quote() {
        let p = build_prompt("Watercolor landscape", None, "butter is a personality trait");
        assert!(p.contains("Watercolor landscape"));
        assert!(p.contains("butter is a personality trait"));
    }

    #[test]
    fn override_replaces_template() {
        let p = build_prompt("Watercolor landscape", Some("Neon cyberpunk alley"), "hi");
        assert!(p.contains("Neon cyberpunk alley"));
        assert!(!p.contains("Watercolor"));
    }

    #[test]
    fn every_prompt_carries_the_no_text_instruction() {
        let p = build_prompt("x", None, "y");
        assert!(p.contains("Do not render the quote"));
    }

    #[test]
    fn softening_strips_denylisted_terms() {
        let softened = soften_prompt("a scene where they kill the dragon with a knife");
        assert!(!softened.contains("kill"));
        assert!(!softened.contains("knife"));
        assert!(softened.contains("dragon"));
    }

    #[test]
    fn softening_is_case_insensitive_and_ignores_punctuation() {
        let softened = soften_prompt("Blood, Guns! and roses");
        assert_eq!(softened, "and roses");
    }

    #[test]
    fn softening_collapses_whitespace() {
        let softened = soften_prompt("calm   seas \n and\t skies");
        assert_eq!(softened, "calm seas and skies");
    }

    #[test]
    fn clean_prompt_is_unchanged_modulo_whitespace() {
        let softened = soften_prompt("a gentle meadow at dawn");
        assert_eq!(softened, "a gentle meadow at dawn");
    }
}
