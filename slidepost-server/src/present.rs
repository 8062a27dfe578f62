//! A present-style slide format.
//!
//! ```text
//! Deck title
//! Optional subtitle lines
//!
//! Author lines
//!
//! * First slide
//!
//! Markdown body
//! : speaker note
//!
//! * Second slide
//! ```
//!
//! Directives such as `.code` or `.image` are rejected: an uploaded deck is
//! a single file and cannot refer to anything else.

use crate::html::escape_html;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};
use slidepost_core::{DocumentFormatter, FormatError};

#[derive(Debug, Default, PartialEq, Eq)]
struct Deck {
    title: String,
    subtitle: Vec<String>,
    authors: Vec<String>,
    notes: Vec<String>,
    slides: Vec<Slide>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Slide {
    heading: String,
    body: String,
    notes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PresentFormatter {
    stylesheet: Option<String>,
}

impl PresentFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link rendered decks to a stylesheet, e.g. one served from `/static`.
    pub fn with_stylesheet(mut self, href: impl Into<String>) -> Self {
        self.stylesheet = Some(href.into());
        self
    }

    fn render_deck(&self, deck: &Deck) -> String {
        let title = escape_html(&deck.title);
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", title));
        if let Some(stylesheet) = &self.stylesheet {
            html.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}\">\n",
                escape_html(stylesheet)
            ));
        }
        html.push_str("</head>\n<body>\n<section class=\"slides\">\n");

        html.push_str("<article class=\"title\">\n");
        html.push_str(&format!("<h1>{}</h1>\n", title));
        for line in &deck.subtitle {
            html.push_str(&format!("<h3>{}</h3>\n", escape_html(line)));
        }
        if !deck.authors.is_empty() {
            html.push_str("<div class=\"authors\">\n");
            for line in &deck.authors {
                html.push_str(&format!("<p>{}</p>\n", escape_html(line)));
            }
            html.push_str("</div>\n");
        }
        push_notes(&mut html, &deck.notes);
        html.push_str("</article>\n");

        for slide in &deck.slides {
            html.push_str("<article>\n");
            html.push_str(&format!("<h3>{}</h3>\n", escape_html(&slide.heading)));
            push_markdown(&mut html, &slide.body);
            push_notes(&mut html, &slide.notes);
            html.push_str("</article>\n");
        }

        html.push_str("</section>\n</body>\n</html>\n");
        html
    }
}

impl DocumentFormatter for PresentFormatter {
    fn validate(&self, label: &str, data: &[u8]) -> Result<(), FormatError> {
        parse_deck(label, data).map(|_| ())
    }

    fn render(&self, label: &str, data: &[u8]) -> Result<String, FormatError> {
        let deck = parse_deck(label, data)?;
        Ok(self.render_deck(&deck))
    }
}

fn parse_deck(label: &str, data: &[u8]) -> Result<Deck, FormatError> {
    let text = std::str::from_utf8(data).map_err(|_| FormatError::Encoding {
        label: label.to_string(),
    })?;
    let syntax_error = |line: usize, message: String| FormatError::Syntax {
        label: label.to_string(),
        line,
        message,
    };

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .skip_while(|(_, line)| line.trim().is_empty())
        .peekable();

    let (title_line, title) = lines
        .next()
        .ok_or_else(|| syntax_error(1, "missing title".to_string()))?;
    let title = title.trim();
    if title.starts_with('*') {
        return Err(syntax_error(
            title_line,
            "expected a title before the first slide".to_string(),
        ));
    }

    let mut deck = Deck {
        title: title.to_string(),
        ..Deck::default()
    };

    while let Some((_, line)) = lines.next_if(|(_, line)| !line.trim().is_empty()) {
        deck.subtitle.push(line.trim().to_string());
    }

    let mut current: Option<Slide> = None;
    let mut in_fence = false;

    for (number, line) in lines {
        let trimmed = line.trim_start();

        if in_fence {
            if trimmed.starts_with("```") {
                in_fence = false;
            }
            push_body_line(&mut current, line, number, label)?;
            continue;
        }

        if let Some(heading) = line.strip_prefix("* ").or((line == "*").then_some("")) {
            let heading = heading.trim();
            if heading.is_empty() {
                return Err(syntax_error(number, "empty slide heading".to_string()));
            }
            deck.slides.extend(current.take());
            current = Some(Slide {
                heading: heading.to_string(),
                ..Slide::default()
            });
            continue;
        }

        if let Some(note) = line.strip_prefix(": ").or((line == ":").then_some("")) {
            let note = note.trim().to_string();
            match current.as_mut() {
                Some(slide) => slide.notes.push(note),
                None => deck.notes.push(note),
            }
            continue;
        }

        if let Some(directive) = directive_name(line) {
            return Err(syntax_error(
                number,
                format!("unsupported directive .{}", directive),
            ));
        }

        if trimmed.starts_with("```") {
            in_fence = true;
        }

        if current.is_none() {
            // the title block ends at the first slide; stray lines are authors
            if !line.trim().is_empty() {
                deck.authors.push(line.trim().to_string());
            }
            continue;
        }

        let line = match line.strip_prefix("** ") {
            Some(subheading) => format!("#### {}", subheading.trim()),
            None => line.to_string(),
        };
        push_body_line(&mut current, &line, number, label)?;
    }

    if in_fence {
        return Err(syntax_error(
            text.lines().count(),
            "unterminated code fence".to_string(),
        ));
    }

    deck.slides.extend(current);
    Ok(deck)
}

fn push_body_line(
    current: &mut Option<Slide>,
    line: &str,
    number: usize,
    label: &str,
) -> Result<(), FormatError> {
    let slide = current.as_mut().ok_or_else(|| FormatError::Syntax {
        label: label.to_string(),
        line: number,
        message: "code block outside of a slide".to_string(),
    })?;
    slide.body.push_str(line);
    slide.body.push('\n');
    Ok(())
}

fn directive_name(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('.')?;
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(rest.split_whitespace().next().unwrap_or(rest))
}

fn push_markdown(html: &mut String, body: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    // raw HTML from an upload is shown, never interpreted
    let events = Parser::new_ext(body, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });
    pulldown_cmark::html::push_html(html, events);
}

/// Keep relative URLs and `http`, `https` or `mailto` ones; anything else
/// (`javascript:`, `data:`, ...) becomes `#`.
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

fn is_safe_url(url: &str) -> bool {
    // browsers ignore whitespace and control characters inside a scheme
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    match cleaned.find([':', '/', '?', '#']) {
        Some(index) if cleaned[index..].starts_with(':') => {
            let scheme = cleaned[..index].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

fn push_notes(html: &mut String, notes: &[String]) {
    if notes.is_empty() {
        return;
    }
    html.push_str("<aside class=\"notes\">\n");
    for note in notes {
        html.push_str(&format!("<p>{}</p>\n", escape_html(note)));
    }
    html.push_str("</aside>\n");
}
