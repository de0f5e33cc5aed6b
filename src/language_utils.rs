//! Language utilities for the `languages` lookup table
//!
//! Names stored in the table are English language names. Input may be an
//! English name or an ISO 639-1 / ISO 639-2 code, which is resolved to its
//! English name so that "fr", "fre", "fra" and "French" land on one row.

use anyhow::{Result, anyhow};
use isolang::Language;

use crate::database::models::LANGUAGE_NAME_LENGTH;

/// Map an ISO 639-2/B code to its ISO 639-2/T equivalent
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    match code {
        "fre" => Some("fra"),
        "ger" => Some("deu"),
        "dut" => Some("nld"),
        "gre" => Some("ell"),
        "chi" => Some("zho"),
        "cze" => Some("ces"),
        "ice" => Some("isl"),
        "alb" => Some("sqi"),
        "arm" => Some("hye"),
        "baq" => Some("eus"),
        "bur" => Some("mya"),
        "per" => Some("fas"),
        "geo" => Some("kat"),
        "may" => Some("msa"),
        "mac" => Some("mkd"),
        "rum" => Some("ron"),
        "slo" => Some("slk"),
        "wel" => Some("cym"),
        _ => None,
    }
}

/// Look up a language by ISO 639-1 or ISO 639-2 (T or B) code
pub fn language_from_code(code: &str) -> Option<Language> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code),
        3 => {
            let part2t: &str = match part2b_to_part2t(&normalized_code) {
                Some(part2t) => part2t,
                None => &normalized_code,
            };
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Resolve user input to the name stored in the `languages` table
///
/// Codes become English names; any other non-blank input is kept as typed
/// (trimmed) so languages outside ISO 639 can still be listed.
pub fn resolve_language_name(input: &str) -> Result<String> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(anyhow!("Language name must not be blank"));
    }

    let name = match language_from_code(trimmed) {
        Some(lang) => lang.to_name().to_string(),
        None => trimmed.to_string(),
    };

    if name.chars().count() > LANGUAGE_NAME_LENGTH {
        return Err(anyhow!(
            "Language name exceeds {} characters: {}",
            LANGUAGE_NAME_LENGTH,
            name
        ));
    }

    Ok(name)
}

/// English names of every language with an ISO 639-1 code, sorted
pub fn default_language_names() -> Vec<String> {
    let letters = b'a'..=b'z';
    let mut names: Vec<String> = letters
        .clone()
        .flat_map(|first| letters.clone().map(move |second| [first, second]))
        .filter_map(|code| std::str::from_utf8(&code).ok().and_then(Language::from_639_1))
        .map(|lang| lang.to_name().to_string())
        .filter(|name| name.chars().count() <= LANGUAGE_NAME_LENGTH)
        .collect();

    names.sort();
    names.dedup();
    names
}
