use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::markers::nth_marker;
use crate::store::Scope;
use crate::templating::TemplatedText;

/// Splits markup into a template plus placeholder arguments.
///
/// Returning `None` means the text has no structure the parser understands.
pub trait RichTextParser: Send + Sync {
    fn parse(&self, text: &str, scope: Scope) -> Option<TemplatedText>;
}

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").expect("tag regex"));

/// Treats `<tag>` elements as fixed structure and every visible text run between them as
/// an argument: `<b>Hi</b> there` becomes `<b>{{A}}</b>{{B}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagParser;

impl RichTextParser for TagParser {
    fn parse(&self, text: &str, _scope: Scope) -> Option<TemplatedText> {
        if !TAG_RE.is_match(text) {
            return None;
        }

        let mut template = String::with_capacity(text.len());
        let mut arguments: HashMap<String, String> = HashMap::new();
        let mut push_run = |run: &str, template: &mut String| -> Option<()> {
            if run.trim().is_empty() {
                template.push_str(run);
                return Some(());
            }
            let marker = nth_marker(arguments.len())?;
            template.push_str(&marker);
            arguments.insert(marker, run.to_string());
            Some(())
        };

        let mut pos = 0usize;
        for m in TAG_RE.find_iter(text) {
            push_run(&text[pos..m.start()], &mut template)?;
            template.push_str(m.as_str());
            pos = m.end();
        }
        push_run(&text[pos..], &mut template)?;

        if arguments.is_empty() {
            return None;
        }
        Some(TemplatedText::new(template, arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_runs_between_tags() {
        let parsed = TagParser
            .parse("<b>Hi</b> there", Scope::Global)
            .expect("parsed");
        assert_eq!(parsed.template, "<b>{{A}}</b>{{B}}");
        assert_eq!(parsed.arguments["{{A}}"], "Hi");
        assert_eq!(parsed.arguments["{{B}}"], " there");
        assert_eq!(parsed.literal(), "<b>Hi</b> there");
    }

    #[test]
    fn plain_or_tag_only_text_is_not_parsed() {
        assert!(TagParser.parse("no markup", Scope::Global).is_none());
        assert!(TagParser.parse("<br/> <br/>", Scope::Global).is_none());
    }
}
