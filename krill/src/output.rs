use crate::excerpt::{excerpt, DEFAULT_MAX_LENGTH};
use crate::filter::FilterSet;
use crate::types::{ItemSink, StreamItem};
use chrono::Local;
use console::Style;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;

// Hashtag or mention not glued to a preceding word character
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^\w])([#@]\w+)").expect("static regex"));
// URL in one of the forms commonly encountered on the web
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w+://[^\s]+|\b[\w.-]+\.[a-zA-Z]{2,4}/[\w#?&=%/:.-]*").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Plain,
    Tag,
    Url,
    Match,
}

/// Renders items for a terminal: header line, excerpt, link.
pub struct ConsoleSink<W: Write> {
    out: W,
    filters: FilterSet,
    colors: bool,
    max_length: usize,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, filters: FilterSet, colors: bool) -> Self {
        Self {
            out,
            filters,
            colors,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn style(&self, style: Style) -> Style {
        style.force_styling(self.colors)
    }

    fn style_for(&self, mark: Mark) -> Style {
        match mark {
            Mark::Plain => self.style(Style::new().white().bright()),
            Mark::Tag => self.style(Style::new().green().bright()),
            Mark::Url => self.style(Style::new().magenta().bright().underlined()),
            Mark::Match => self.style(Style::new().black().on_yellow().on_bright()),
        }
    }

    fn highlight(&self, text: &str, pattern: Option<&Regex>) -> String {
        let mut marks = vec![Mark::Plain; text.len()];
        let mut paint = |start: usize, end: usize, mark: Mark| marks[start..end].fill(mark);

        for caps in TAG.captures_iter(text) {
            if let Some(tag) = caps.get(1) {
                paint(tag.start(), tag.end(), Mark::Tag);
            }
        }
        for url in URL.find_iter(text) {
            paint(url.start(), url.end(), Mark::Url);
        }
        if let Some(pattern) = pattern {
            for found in pattern.find_iter(text) {
                paint(found.start(), found.end(), Mark::Match);
            }
        }

        let mut rendered = String::with_capacity(text.len());
        let mut segment_start = 0;
        for i in 1..=text.len() {
            if i == text.len() || marks[i] != marks[segment_start] {
                let segment = &text[segment_start..i];
                rendered.push_str(&self.style_for(marks[segment_start]).apply_to(segment).to_string());
                segment_start = i;
            }
        }
        rendered
    }
}

impl<W: Write> ItemSink for ConsoleSink<W> {
    fn emit(&mut self, item: &StreamItem) -> anyhow::Result<()> {
        let local = item.timestamp.with_timezone(&Local);
        let time = self.style(Style::new().yellow());
        let header = format!(
            "{} on {} at {}:",
            self.style(Style::new().cyan().bright()).apply_to(item.display_source()),
            time.apply_to(local.format("%a, %d %b %Y")),
            time.apply_to(local.format("%H:%M")),
        );

        let pattern = self.filters.first_match(&item.text);
        let excerpt = excerpt(&item.text, pattern, self.max_length);
        let body = self.highlight(&excerpt.text, pattern);

        writeln!(self.out)?;
        writeln!(self.out, "{}", header)?;
        writeln!(
            self.out,
            "   {}{}{}",
            if excerpt.clipped_left { "... " } else { "" },
            body,
            if excerpt.clipped_right { " ..." } else { "" }
        )?;
        if let Some(link) = &item.link {
            writeln!(
                self.out,
                "   {}",
                self.style(Style::new().blue().bright().underlined()).apply_to(link)
            )?;
        }
        Ok(())
    }

    fn end_cycle(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per item per line.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ItemSink for JsonSink<W> {
    fn emit(&mut self, item: &StreamItem) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, item)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn end_cycle(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
