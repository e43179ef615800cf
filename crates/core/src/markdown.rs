//! Markdown body → ordered content blocks.
//!
//! | Markdown                         | Block                         |
//! |----------------------------------|-------------------------------|
//! | paragraph                        | `Paragraph` (inline flattened)|
//! | paragraph holding a single link  | `Link`                        |
//! | image                            | `Image` (splits a paragraph)  |
//! | fenced / indented code           | `CodeExample`                 |
//! | heading                          | `Heading`                     |
//! | flat list                        | `List`                        |
//! | thematic break                   | dropped                       |
//!
//! Anything else (tables, block quotes, raw HTML, footnotes, nested lists)
//! is rejected with [`Error::InvalidBlock`].

use crate::error::{Error, Result};
use crate::types::ContentBlock;
use log::debug;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Parse a Markdown document into content blocks, in document order.
pub fn parse_body(src: &str) -> Result<Vec<ContentBlock>> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH;

    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(src, options) {
        builder.push(event)?;
    }
    Ok(builder.blocks)
}

#[derive(Default)]
enum State {
    #[default]
    Top,
    Paragraph,
    Heading(u8),
    Code(Option<String>),
    List {
        ordered: bool,
        items: Vec<String>,
    },
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<ContentBlock>,
    state: State,
    text: String,
    /// Target of the link currently open, with the label collected so far
    link: Option<(String, String)>,
    /// Links closed inside the current paragraph
    links: Vec<(String, String)>,
    /// Whether the paragraph has text outside any link
    loose_text: bool,
    /// Source and alt text of the image currently open
    image: Option<(String, String)>,
}

impl BlockBuilder {
    fn push(&mut self, event: Event<'_>) -> Result<()> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                self.text_run(&text);
                Ok(())
            }
            Event::Code(code) => {
                self.text_run(&code);
                Ok(())
            }
            Event::SoftBreak | Event::HardBreak => {
                self.text_run(" ");
                Ok(())
            }
            Event::Rule => {
                debug!("dropping thematic break");
                Ok(())
            }
            Event::Html(_) | Event::InlineHtml(_) => {
                Err(Error::InvalidBlock("raw HTML is not supported".to_string()))
            }
            Event::FootnoteReference(_) => {
                Err(Error::InvalidBlock("footnotes are not supported".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn text_run(&mut self, run: &str) {
        if let Some((_, alt)) = self.image.as_mut() {
            alt.push_str(run);
            return;
        }
        self.text.push_str(run);
        match self.link.as_mut() {
            Some((_, label)) => label.push_str(run),
            None if !run.trim().is_empty() => self.loose_text = true,
            None => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) -> Result<()> {
        match tag {
            Tag::Paragraph => {
                // Loose list items wrap their text in paragraphs
                if matches!(self.state, State::Top) {
                    self.state = State::Paragraph;
                    self.reset_inline();
                }
            }
            Tag::Heading { level, .. } => {
                self.expect_top("headings")?;
                self.state = State::Heading(level as u8);
                self.reset_inline();
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                };
                self.expect_top("code examples")?;
                self.state = State::Code(language);
                self.text.clear();
            }
            Tag::List(start) => {
                if matches!(self.state, State::List { .. }) {
                    return Err(Error::InvalidBlock(
                        "nested lists are not supported".to_string(),
                    ));
                }
                self.state = State::List {
                    ordered: start.is_some(),
                    items: Vec::new(),
                };
            }
            Tag::Item => self.reset_inline(),
            Tag::Link { dest_url, .. } => {
                self.link = Some((dest_url.to_string(), String::new()));
            }
            Tag::Image { dest_url, .. } => {
                if !matches!(self.state, State::Paragraph) {
                    return Err(Error::InvalidBlock(
                        "images must stand in their own paragraph".to_string(),
                    ));
                }
                if self.link.is_some() {
                    return Err(Error::InvalidBlock(
                        "images inside links are not supported".to_string(),
                    ));
                }
                self.flush_paragraph()?;
                self.image = Some((dest_url.to_string(), String::new()));
            }
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {}
            other => {
                return Err(Error::InvalidBlock(format!(
                    "unsupported markdown construct: {}",
                    construct_name(&other)
                )));
            }
        }
        Ok(())
    }

    fn end(&mut self, tag: TagEnd) -> Result<()> {
        match tag {
            TagEnd::Paragraph => {
                if matches!(self.state, State::Paragraph) {
                    self.flush_paragraph()?;
                    self.state = State::Top;
                } else {
                    self.text.push(' ');
                }
            }
            TagEnd::Heading(_) => {
                if let State::Heading(level) = std::mem::take(&mut self.state) {
                    self.blocks.push(ContentBlock::Heading {
                        level,
                        text: self.text.trim().to_string(),
                    });
                }
            }
            TagEnd::CodeBlock => {
                if let State::Code(language) = std::mem::take(&mut self.state) {
                    self.blocks.push(ContentBlock::CodeExample {
                        source: self.text.trim_end_matches('\n').to_string(),
                        language,
                    });
                }
                self.text.clear();
            }
            TagEnd::Item => {
                if let State::List { items, .. } = &mut self.state {
                    items.push(self.text.trim().to_string());
                }
                self.text.clear();
            }
            TagEnd::List(_) => {
                if let State::List { ordered, items } = std::mem::take(&mut self.state) {
                    self.blocks.push(ContentBlock::List { ordered, items });
                }
            }
            TagEnd::Link => {
                if let Some(link) = self.link.take() {
                    self.links.push(link);
                }
            }
            TagEnd::Image => {
                if let Some((uri, alt)) = self.image.take() {
                    self.blocks.push(ContentBlock::Image {
                        uri,
                        alt: alt.trim().to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Block-level content may only open at the top of the document.
    fn expect_top(&self, what: &str) -> Result<()> {
        match self.state {
            State::Top => Ok(()),
            State::List { .. } => Err(Error::InvalidBlock(format!(
                "{} inside list items are not supported",
                what
            ))),
            _ => Err(Error::InvalidBlock(format!("misplaced {}", what))),
        }
    }

    /// Emit whatever paragraph text has accumulated and start afresh.
    fn flush_paragraph(&mut self) -> Result<()> {
        let text = self.text.trim();
        if text.is_empty() && !self.links.is_empty() {
            return Err(Error::InvalidBlock("link without a label".to_string()));
        }
        if !text.is_empty() {
            let block = match self.links.as_slice() {
                [(uri, label)] if !self.loose_text => ContentBlock::Link {
                    uri: uri.clone(),
                    label: label.trim().to_string(),
                },
                _ => ContentBlock::Paragraph {
                    text: text.to_string(),
                },
            };
            self.blocks.push(block);
        }
        self.reset_inline();
        Ok(())
    }

    fn reset_inline(&mut self) {
        self.text.clear();
        self.links.clear();
        self.loose_text = false;
    }
}

fn construct_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::BlockQuote(_) => "block quote",
        Tag::Table(_) | Tag::TableHead | Tag::TableRow | Tag::TableCell => "table",
        Tag::HtmlBlock => "raw HTML block",
        Tag::FootnoteDefinition(_) => "footnote",
        Tag::MetadataBlock(_) => "metadata block",
        _ => "markup",
    }
}
