//! Heading-aware markdown chunking.
//!
//! Documents are segmented in three passes:
//! 1. Split at `#` / `##` headings into sections. A `#` title is not content
//!    itself; it prefixes the heading path of the sections that follow.
//!    `###` headings stay inside their `##` section.
//! 2. Sections longer than the chunk size are re-split at `###` headings.
//! 3. Anything still longer than the chunk size is packed greedily by
//!    paragraph. Paragraphs are never split, so a single oversized paragraph
//!    yields an oversized chunk.
//!
//! Every pass is a fold over an explicit state value, so chunking is a pure
//! function of the document text.

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// Default soft limit on chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

const HEADING_SEPARATOR: &str = " > ";
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A heading-delimited slice of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading path, e.g. "Title > Subsection".
    pub heading: String,
    /// Trimmed section body (non-empty).
    pub content: String,
}

/// The retrievable unit stored in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, trimmed and non-empty.
    pub text: String,
    /// Source document filename.
    pub filename: String,
    /// `"<section>"` or `"<section>_<part>"`, unique within the file.
    pub chunk_id: String,
    /// Heading path of the originating section.
    pub heading: String,
}

impl Chunk {
    /// Identifier of this chunk across the whole corpus.
    pub fn index_id(&self) -> String {
        format!("{}_{}", self.filename, self.chunk_id)
    }

    pub fn char_count(&self) -> usize {
        char_len(&self.text)
    }
}

/// Markdown line classes relevant to splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Title(&'a str),
    Heading(&'a str),
    Subheading(&'a str),
    Body,
}

fn classify(line: &str) -> Line<'_> {
    let text = || line.trim_start_matches('#').trim();
    if line.starts_with("# ") {
        Line::Title(text())
    } else if line.starts_with("## ") {
        Line::Heading(text())
    } else if line.starts_with("### ") {
        Line::Subheading(text())
    } else {
        Line::Body
    }
}

fn join_heading(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}{HEADING_SEPARATOR}{child}")
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Lines collected under one heading path.
#[derive(Debug, Clone, Default)]
struct SectionBuffer<'a> {
    heading: String,
    lines: Vec<&'a str>,
}

impl<'a> SectionBuffer<'a> {
    fn new(heading: String) -> Self {
        Self {
            heading,
            lines: Vec::new(),
        }
    }

    fn starting_with(heading: String, line: &'a str) -> Self {
        Self {
            heading,
            lines: vec![line],
        }
    }

    fn push(mut self, line: &'a str) -> Self {
        self.lines.push(line);
        self
    }

    /// Close the buffer. Sections without any body text are dropped.
    fn seal(self) -> Option<Section> {
        let has_body = self
            .lines
            .iter()
            .any(|line| classify(line) == Line::Body && !line.trim().is_empty());
        if !has_body {
            return None;
        }
        let content = self.lines.join("\n").trim().to_string();
        Some(Section {
            heading: self.heading.trim().to_string(),
            content,
        })
    }
}

/// State of the top-level (`#` / `##`) split.
#[derive(Debug, Clone, Default)]
struct SplitState<'a> {
    title: String,
    buffer: SectionBuffer<'a>,
}

impl<'a> SplitState<'a> {
    fn step(self, line: &'a str) -> (Option<Section>, Self) {
        match classify(line) {
            Line::Title(title) => {
                let sealed = self.buffer.seal();
                let next = Self {
                    title: title.to_string(),
                    buffer: SectionBuffer::new(title.to_string()),
                };
                (sealed, next)
            }
            Line::Heading(name) => {
                let sealed = self.buffer.seal();
                let heading = join_heading(&self.title, name);
                let next = Self {
                    title: self.title,
                    buffer: SectionBuffer::starting_with(heading, line),
                };
                (sealed, next)
            }
            Line::Subheading(_) | Line::Body => {
                let next = Self {
                    title: self.title,
                    buffer: self.buffer.push(line),
                };
                (None, next)
            }
        }
    }

    fn finish(self) -> Option<Section> {
        self.buffer.seal()
    }
}

/// Split markdown into `##`-level sections.
fn split_top_level(text: &str) -> Vec<Section> {
    let (mut sections, last) = text.lines().fold(
        (Vec::new(), SplitState::default()),
        |(mut sections, state), line| {
            let (sealed, next) = state.step(line);
            sections.extend(sealed);
            (sections, next)
        },
    );
    sections.extend(last.finish());
    sections
}

/// Split one section at `###` headings.
fn split_subsections(section: &Section) -> Vec<Section> {
    let parent = section.heading.as_str();
    let (mut children, last) = section.content.lines().fold(
        (Vec::new(), SectionBuffer::new(parent.to_string())),
        |(mut children, buffer), line| match classify(line) {
            Line::Subheading(name) => {
                children.extend(buffer.seal());
                (
                    children,
                    SectionBuffer::starting_with(join_heading(parent, name), line),
                )
            }
            _ => (children, buffer.push(line)),
        },
    );
    children.extend(last.seal());
    children
}

/// Greedily pack paragraphs into buffers of at most `limit` characters.
///
/// A buffer is sealed when appending the next paragraph would overflow it.
/// A paragraph that alone exceeds `limit` becomes its own oversized buffer.
fn pack_paragraphs(content: &str, limit: usize) -> Vec<String> {
    let paragraphs = content
        .split(PARAGRAPH_SEPARATOR)
        .map(|p| p.trim_matches('\n'))
        .filter(|p| !p.trim().is_empty());

    let (mut packed, (last, _)) = paragraphs.fold(
        (Vec::new(), (String::new(), 0usize)),
        |(mut packed, (buffer, len)), para| {
            let para_len = char_len(para);
            if buffer.is_empty() {
                (packed, (para.to_string(), para_len))
            } else if len + PARAGRAPH_SEPARATOR.len() + para_len > limit {
                packed.push(buffer);
                (packed, (para.to_string(), para_len))
            } else {
                let joined = format!("{buffer}{PARAGRAPH_SEPARATOR}{para}");
                (packed, (joined, len + PARAGRAPH_SEPARATOR.len() + para_len))
            }
        },
    );
    if !last.is_empty() {
        packed.push(last);
    }

    packed
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Heading-aware, size-bounded markdown chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownChunker {
    chunk_size: usize,
}

impl Default for MarkdownChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl MarkdownChunker {
    /// Create a chunker with the given soft size limit (characters).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split text into sections (passes 1 and 2).
    pub fn sections(&self, text: &str) -> Vec<Section> {
        split_top_level(text)
            .into_iter()
            .flat_map(|section| {
                if char_len(&section.content) > self.chunk_size {
                    split_subsections(&section)
                } else {
                    vec![section]
                }
            })
            .collect()
    }

    /// Chunk a single document.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.sections(&document.content)
            .into_iter()
            .enumerate()
            .flat_map(|(index, section)| self.section_chunks(&document.filename, index, section))
            .collect()
    }

    /// Chunk every document, preserving document order.
    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }

    fn section_chunks(&self, filename: &str, index: usize, section: Section) -> Vec<Chunk> {
        if char_len(&section.content) <= self.chunk_size {
            return vec![Chunk {
                text: section.content,
                filename: filename.to_string(),
                chunk_id: index.to_string(),
                heading: section.heading,
            }];
        }

        pack_paragraphs(&section.content, self.chunk_size)
            .into_iter()
            .enumerate()
            .map(|(part, text)| Chunk {
                text,
                filename: filename.to_string(),
                chunk_id: format!("{index}_{part}"),
                heading: section.heading.clone(),
            })
            .collect()
    }
}
