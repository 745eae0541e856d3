use crate::search::SearchHit;

/// Built-in template used when a club has not stored its own.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Du är en kansli assistent för {clubName}.
Använd följande information för att svara på frågan:

KLUBBENS KONTEXT:
{clubContext}

KLUBBENS REGLER:
{clubRules}

RELEVANTA DOKUMENT:
{relevantDocuments}

RELEVANTA EXEMPEL PÅ FRÅGOR OCH SVAR:
{qaExamples}

FRÅGA: {message}

Svara på frågan baserat på den tillgängliga informationen.
Om du inte hittar relevant information i dokumenten eller exemplen,
använd klubbens kontext och regler för att ge ett generellt svar.
Var tydlig och konkret i ditt svar.";

pub const FALLBACK_CLUB_NAME: &str = "golfklubben";

/// Everything substituted into a prompt template.
#[derive(Debug, Default)]
pub struct PromptContext<'a> {
    pub club_name: &'a str,
    pub club_context: &'a str,
    pub club_rules: &'a str,
    pub documents: &'a [SearchHit],
    pub qa_examples: &'a [SearchHit],
    pub message: &'a str,
}

pub fn format_documents(documents: &[SearchHit]) -> String {
    documents
        .iter()
        .map(|doc| format!("\nTitel: {}\nInnehåll: {}\n---", doc.title, doc.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_qa_examples(examples: &[SearchHit]) -> String {
    examples
        .iter()
        .map(|qa| {
            format!(
                "\nFråga: {}\nSvar: {}\n---",
                qa.question.as_deref().unwrap_or(&qa.title),
                qa.answer.as_deref().unwrap_or(&qa.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fills every known placeholder in one pass, so placeholder-like text inside
/// the substituted values is never expanded again.
pub fn render_prompt(template: &str, ctx: &PromptContext<'_>) -> String {
    let club_name = if ctx.club_name.trim().is_empty() {
        FALLBACK_CLUB_NAME
    } else {
        ctx.club_name
    };
    let documents = format_documents(ctx.documents);
    let qa_examples = format_qa_examples(ctx.qa_examples);

    let lookup = |key: &str| -> Option<&str> {
        match key {
            "clubName" => Some(club_name),
            "clubContext" => Some(ctx.club_context),
            "clubRules" => Some(ctx.club_rules),
            "relevantDocuments" => Some(&documents),
            "qaExamples" => Some(&qa_examples),
            "message" => Some(ctx.message),
            _ => None,
        }
    };

    let mut output = String::with_capacity(template.len() + documents.len() + qa_examples.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => match lookup(&after[..close]) {
                Some(value) => {
                    output.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    output.push('{');
                    rest = after;
                }
            },
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchKind;

    fn doc(title: &str, content: &str) -> SearchHit {
        SearchHit {
            id: format!("document-{}", title),
            kind: SearchKind::Document,
            title: title.to_string(),
            content: content.to_string(),
            question: None,
            answer: None,
            score: 1.0,
        }
    }

    fn qa(question: &str, answer: &str) -> SearchHit {
        SearchHit {
            id: format!("qa-{}", question),
            kind: SearchKind::QaExample,
            title: question.to_string(),
            content: answer.to_string(),
            question: Some(question.to_string()),
            answer: Some(answer.to_string()),
            score: 1.0,
        }
    }

    #[test]
    fn test_default_template_substitutes_all_placeholders() {
        let docs = vec![doc("Restaurang", "Lunch 11-14")];
        let examples = vec![qa("Har ni öppet?", "Ja, 08-15")];
        let ctx = PromptContext {
            club_name: "Vasatorps GK",
            club_context: "Skånsk klubb",
            club_rules: "Mjuka spikes",
            documents: &docs,
            qa_examples: &examples,
            message: "När serveras lunch?",
        };

        let prompt = render_prompt(DEFAULT_PROMPT_TEMPLATE, &ctx);

        for placeholder in [
            "{clubName}",
            "{clubContext}",
            "{clubRules}",
            "{relevantDocuments}",
            "{qaExamples}",
            "{message}",
        ] {
            assert!(!prompt.contains(placeholder), "{} left in prompt", placeholder);
        }
        assert!(prompt.starts_with("Du är en kansli assistent för Vasatorps GK."));
        assert!(prompt.contains("Titel: Restaurang\nInnehåll: Lunch 11-14\n---"));
        assert!(prompt.contains("Fråga: Har ni öppet?\nSvar: Ja, 08-15\n---"));
        assert!(prompt.contains("FRÅGA: När serveras lunch?"));
    }

    #[test]
    fn test_missing_club_name_falls_back() {
        let ctx = PromptContext {
            message: "Hej",
            ..Default::default()
        };
        let prompt = render_prompt("Assistent för {clubName}: {message}", &ctx);
        assert_eq!(prompt, "Assistent för golfklubben: Hej");
    }

    #[test]
    fn test_unknown_and_unclosed_braces_are_kept() {
        let ctx = PromptContext {
            club_name: "GK",
            ..Default::default()
        };
        assert_eq!(
            render_prompt("{unknown} {clubName} {", &ctx),
            "{unknown} GK {"
        );
        assert_eq!(render_prompt("{{clubName}}", &ctx), "{GK}");
    }

    #[test]
    fn test_values_are_not_expanded_twice() {
        let ctx = PromptContext {
            club_name: "GK",
            message: "What is {clubName}?",
            ..Default::default()
        };
        assert_eq!(render_prompt("{message}", &ctx), "What is {clubName}?");
    }

    #[test]
    fn test_format_joins_items() {
        let docs = vec![doc("A", "a"), doc("B", "b")];
        assert_eq!(
            format_documents(&docs),
            "\nTitel: A\nInnehåll: a\n---\n\nTitel: B\nInnehåll: b\n---"
        );
        assert_eq!(format_documents(&[]), "");
    }
}
