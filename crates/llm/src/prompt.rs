//! The translation instruction sent with every request.

/// Build the single user message asking for a Traditional Chinese
/// translation of `text`. Arabic numerals are kept as they are and the
/// reply must be the bare translation.
pub fn translation_prompt(text: &str) -> String {
    format!(
        "translate \"{}\" into traditional chinese but the Arabic numerals do not need to be translated, \
         just put translated result without any other descriptions",
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_text_verbatim() {
        assert_eq!(
            translation_prompt("Revenue grew 12% in 2023"),
            "translate \"Revenue grew 12% in 2023\" into traditional chinese but the Arabic numerals \
             do not need to be translated, just put translated result without any other descriptions"
        );
    }

    #[test]
    fn test_prompt_keeps_quotes_and_newlines() {
        let prompt = translation_prompt("say \"hi\"\nbye");
        assert!(prompt.starts_with("translate \"say \"hi\"\nbye\" into"));
    }
}
