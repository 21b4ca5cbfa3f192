//! Line-number annotation and highlighted excerpts for unified-diff patches.
//!
//! `diffnote` takes the `patch` text of a single file, as returned by a
//! code-hosting compare API, and reconstructs which line of the base and head
//! version every patch line corresponds to. With that table it can render a
//! small, highlighted excerpt around any line of the patch, which is what an
//! inline review-comment notification shows next to the comment text.
//!
//! ## Getting Started
//!
//! ````rust
//! use diffnote::{LineTable, HighlightOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let patch = "@@ -1,3 +1,3 @@\n fn main() {\n-    println!(\"Hello, world!\");\n+    println!(\"Hello, diffnote!\");\n }";
//!
//! // 1. Build the table once per patch.
//! let table = LineTable::build(patch);
//! assert_eq!(table.len(), 5);
//!
//! // 2. Render the excerpt around the deleted line (index 2).
//! let excerpt = table.render(2, HighlightOptions::default().context)?;
//! assert_eq!(
//!     excerpt,
//!     " 1 1     fn main() {\n 2    * -    println!(\"Hello, world!\");\n   2    +    println!(\"Hello, diffnote!\");\n 3 3     }"
//! );
//!
//! // 3. The head-side line number of a target is what deep links point at.
//! assert_eq!(table.head_line(3)?, 2);
//! # Ok(())
//! # }
//! ````
//!
//! ## Key Concepts
//!
//! - [`LineTable`]: one [`Slot`] per line of the patch text. Hunk headers occupy
//!   a [`Slot::Header`] so that every other line keeps its original index.
//! - [`AnnotatedLine`]: a content line together with the base and head line
//!   numbers it sits at.
//! - [`LineTable::render`]: the excerpt. It never crosses a hunk header, so lines
//!   from an unrelated region of the file are never shown next to the target.
//! - [`notify`]: turns a compare document, a file and a line into the payload of
//!   a chat notification.
//!
//! ## Feature Flags
//!
//! ### `parallel`
//!
//! - **Enabled by default.**
//! - Builds the tables of many files at once with
//!   [`rayon`](https://crates.io/crates/rayon) in [`annotate_files`].
use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use similar::{ChangeTag, TextDiff};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

pub mod notify;

pub use notify::{
    annotate_files, Account, Commit, CommitDetail, CommentNotification, CompareDiff, FileChange,
    LoadError, NotifyError, Signature,
};

/// The number of lines shown on each side of the target when no size is given.
pub const DEFAULT_CONTEXT: usize = 4;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -([0-9]+),([0-9]+) \+([0-9]+),([0-9]+) @@(.*)").unwrap()
});

// --- Error Types ---

/// The reasons a target line cannot be highlighted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HighlightError {
    /// The target index is past the end of the patch.
    #[error("Line {index} is outside the patch, which has {len} lines")]
    OutOfRange {
        /// The requested 0-based index.
        index: usize,
        /// The number of lines in the patch.
        len: usize,
    },
    /// The target index points at a `@@ ... @@` header rather than a content line.
    #[error("Line {index} is a hunk header and cannot be highlighted")]
    HunkHeader {
        /// The requested 0-based index.
        index: usize,
    },
}

// --- Options ---

/// Options for rendering an excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightOptions {
    /// How far the window reaches on each side of the target line.
    pub context: usize,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT,
        }
    }
}

impl HighlightOptions {
    /// Creates a new builder for `HighlightOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::HighlightOptions;
    /// let options = HighlightOptions::builder().context(10).build();
    /// assert_eq!(options.context, 10);
    ///
    /// let defaults = HighlightOptions::builder().build();
    /// assert_eq!(defaults, HighlightOptions::default());
    /// ```
    pub fn builder() -> HighlightOptionsBuilder {
        HighlightOptionsBuilder::default()
    }
}

/// A builder for creating `HighlightOptions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighlightOptionsBuilder {
    context: Option<usize>,
}

impl HighlightOptionsBuilder {
    /// Sets how far the window reaches on each side of the target line.
    pub fn context(mut self, context: usize) -> Self {
        self.context = Some(context);
        self
    }

    /// Builds the `HighlightOptions`.
    pub fn build(self) -> HighlightOptions {
        let default = HighlightOptions::default();
        HighlightOptions {
            context: self.context.unwrap_or(default.context),
        }
    }
}

// --- Data Structures ---

/// A parsed `@@ -l,s +l,s @@ section` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    /// The first base-side line covered by the hunk.
    pub base_start: usize,
    /// The number of base-side lines covered by the hunk.
    pub base_len: usize,
    /// The first head-side line covered by the hunk.
    pub head_start: usize,
    /// The number of head-side lines covered by the hunk.
    pub head_len: usize,
    /// Whatever follows the closing `@@`, usually the enclosing function.
    pub section: String,
}

impl HunkHeader {
    /// Parses a hunk header line.
    ///
    /// Both lengths are required. Shorter forms such as `@@ -1 +1 @@` are not
    /// headers for the purpose of line numbering and yield `None`. Only ASCII
    /// digits are accepted, so numbers written in other Unicode digit scripts
    /// also yield `None`, as do numbers too large for `usize`.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::HunkHeader;
    /// let header = HunkHeader::parse("@@ -72,10 +72,12 @@ const convert = (").unwrap();
    /// assert_eq!(header.base_start, 72);
    /// assert_eq!(header.head_len, 12);
    /// assert_eq!(header.section, " const convert = (");
    ///
    /// assert!(HunkHeader::parse("@@ -1 +1 @@").is_none());
    /// assert!(HunkHeader::parse("@@ -\u{0661},2 +1,2 @@").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let captures = HUNK_HEADER.captures(line)?;
        let number = |group: usize| captures[group].parse::<usize>().ok();
        Some(HunkHeader {
            base_start: number(1)?,
            base_len: number(2)?,
            head_start: number(3)?,
            head_len: number(4)?,
            section: captures[5].to_string(),
        })
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@{}",
            self.base_start, self.base_len, self.head_start, self.head_len, self.section
        )
    }
}

/// What a content line does to the file, judged by its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A line starting with `-`. Present in base only.
    Deletion,
    /// A line starting with `+`. Present in head only.
    Addition,
    /// Any other line, including a blank one. Present on both sides.
    Context,
}

impl LineKind {
    /// Classifies a raw patch line.
    pub fn of(text: &str) -> Self {
        if text.starts_with('-') {
            LineKind::Deletion
        } else if text.starts_with('+') {
            LineKind::Addition
        } else {
            LineKind::Context
        }
    }
}

/// A content line of a patch with the line numbers it has on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    /// The 0-based position of the line in the patch text.
    pub index: usize,
    /// The base-side line number. For an addition this is the number the next
    /// base line will get.
    pub base_line: usize,
    /// The head-side line number. For a deletion this is the number the next
    /// head line will get.
    pub head_line: usize,
    /// The raw line, marker included.
    pub text: String,
}

impl AnnotatedLine {
    /// Classifies the line by its marker.
    pub fn kind(&self) -> LineKind {
        LineKind::of(&self.text)
    }

    /// Formats the line as one row of an excerpt.
    ///
    /// The base number is right-aligned and the head number left-aligned, each
    /// in a two character column. The side a line does not exist on is left
    /// blank. `selected` puts a `*` in the marker column.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::AnnotatedLine;
    /// let line = AnnotatedLine {
    ///     index: 3,
    ///     base_line: 7,
    ///     head_line: 9,
    ///     text: "-removed".to_string(),
    /// };
    /// assert_eq!(line.format_row(true), " 7    * -removed");
    /// assert_eq!(line.format_row(false), " 7      -removed");
    /// ```
    pub fn format_row(&self, selected: bool) -> String {
        let (base, head) = match self.kind() {
            LineKind::Deletion => (self.base_line.to_string(), String::new()),
            LineKind::Addition => (String::new(), self.head_line.to_string()),
            LineKind::Context => (self.base_line.to_string(), self.head_line.to_string()),
        };
        let marker = if selected { '*' } else { ' ' };
        format!("{:>2} {:<2} {} {}", base, head, marker, self.text)
    }
}

/// One entry of a [`LineTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// A hunk header. It keeps its index but is never part of an excerpt.
    Header(HunkHeader),
    /// A content line.
    Line(AnnotatedLine),
}

impl Slot {
    /// Returns the annotated line, or `None` for a header.
    pub fn line(&self) -> Option<&AnnotatedLine> {
        match self {
            Slot::Line(line) => Some(line),
            Slot::Header(_) => None,
        }
    }

    /// Returns the hunk header, or `None` for a content line.
    pub fn header(&self) -> Option<&HunkHeader> {
        match self {
            Slot::Header(header) => Some(header),
            Slot::Line(_) => None,
        }
    }
}

/// The annotated lines of one patch, indexed by their position in the patch text.
///
/// The table is built once and never changes afterwards, so it can be shared
/// freely and rendered from as many times as needed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTable {
    slots: Vec<Slot>,
}

impl LineTable {
    /// Builds the table for a patch.
    ///
    /// The text is split on `\n` with no special handling of a trailing newline,
    /// so `"a\n"` has two lines, the second one empty. Both counters start at 0
    /// and are reset by every hunk header. After each content line a deletion
    /// advances the base counter, an addition the head counter, and anything
    /// else both. Counters stop at `usize::MAX` instead of wrapping.
    ///
    /// A line that starts with `@@` but does not have the full
    /// `@@ -l,s +l,s @@` shape is counted as an ordinary context line.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::{LineTable, Slot};
    /// let table = LineTable::build("@@ -10,2 +20,2 @@\n-old\n+new\n same");
    /// assert!(matches!(table.get(0), Some(Slot::Header(_))));
    ///
    /// let numbers: Vec<_> = table
    ///     .lines()
    ///     .map(|l| (l.base_line, l.head_line))
    ///     .collect();
    /// assert_eq!(numbers, vec![(10, 20), (11, 20), (11, 21)]);
    /// ```
    pub fn build(patch: &str) -> Self {
        let mut base = 0;
        let mut head = 0;
        let mut slots = Vec::new();

        for (index, text) in patch.split('\n').enumerate() {
            if let Some(header) = HunkHeader::parse(text) {
                trace!(
                    "  Line {}: hunk header, counters reset to base {} / head {}.",
                    index,
                    header.base_start,
                    header.head_start
                );
                base = header.base_start;
                head = header.head_start;
                slots.push(Slot::Header(header));
                continue;
            }

            if text.starts_with("@@") {
                warn!(
                    "Line {} starts with '@@' but is not a hunk header; counting it as context: {}",
                    index, text
                );
            }

            let line = AnnotatedLine {
                index,
                base_line: base,
                head_line: head,
                text: text.to_string(),
            };
            match line.kind() {
                LineKind::Deletion => base = base.saturating_add(1),
                LineKind::Addition => head = head.saturating_add(1),
                LineKind::Context => {
                    base = base.saturating_add(1);
                    head = head.saturating_add(1);
                }
            }
            slots.push(Slot::Line(line));
        }

        let table = LineTable { slots };
        debug!(
            "Built line table: {} lines, {} hunk(s).",
            table.len(),
            table.hunk_count()
        );
        table
    }

    /// The number of slots, which is the number of lines in the patch text.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the table has no slots.
    ///
    /// A table built from text is never empty, since even `""` has one line.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the slot at `index`.
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Returns the content line at `index`, or `None` for a header or an
    /// index past the end.
    pub fn line(&self, index: usize) -> Option<&AnnotatedLine> {
        self.get(index).and_then(Slot::line)
    }

    /// All slots, in patch order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Iterates over the content lines, skipping headers.
    pub fn lines(&self) -> impl Iterator<Item = &AnnotatedLine> + '_ {
        self.slots.iter().filter_map(Slot::line)
    }

    /// Iterates over the hunk headers.
    pub fn headers(&self) -> impl Iterator<Item = &HunkHeader> + '_ {
        self.slots.iter().filter_map(Slot::header)
    }

    /// The number of hunk headers in the patch.
    pub fn hunk_count(&self) -> usize {
        self.headers().count()
    }

    /// Returns the content line at `target`, or why it cannot be highlighted.
    ///
    /// # Errors
    ///
    /// - [`HighlightError::OutOfRange`] if `target` is past the end.
    /// - [`HighlightError::HunkHeader`] if `target` is a header slot.
    pub fn checked_line(&self, target: usize) -> Result<&AnnotatedLine, HighlightError> {
        match self.slots.get(target) {
            None => Err(HighlightError::OutOfRange {
                index: target,
                len: self.slots.len(),
            }),
            Some(Slot::Header(_)) => Err(HighlightError::HunkHeader { index: target }),
            Some(Slot::Line(line)) => Ok(line),
        }
    }

    /// The head-side line number of the line at `target`.
    ///
    /// This is the number a link into the head version of the file should use.
    pub fn head_line(&self, target: usize) -> Result<usize, HighlightError> {
        self.checked_line(target).map(|line| line.head_line)
    }

    /// Collects the lines of the excerpt around `target`, in patch order.
    ///
    /// The window covers the indices in `(target - context, target + context)`,
    /// with the lower bound clamped to 0 and itself never included. Each side
    /// stops early at the first hunk header it meets, so the window always stays
    /// inside the hunk that contains `target`. A `context` of 0 yields an empty
    /// window.
    ///
    /// # Errors
    ///
    /// Fails like [`checked_line`](Self::checked_line) when `target` is not a
    /// content line.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::LineTable;
    /// let table = LineTable::build("@@ -1,2 +1,2 @@\n a\n b\n@@ -9,2 +9,2 @@\n c\n d");
    /// let indices: Vec<_> = table.window(2, 4)?.iter().map(|l| l.index).collect();
    /// assert_eq!(indices, vec![1, 2]);
    /// # Ok::<(), diffnote::HighlightError>(())
    /// ```
    pub fn window(
        &self,
        target: usize,
        context: usize,
    ) -> Result<Vec<&AnnotatedLine>, HighlightError> {
        self.checked_line(target)?;

        let start = target.saturating_sub(context);
        let end = target.saturating_add(context).min(self.slots.len());
        debug!(
            "Window for line {}: ({}, {}) with context {}.",
            target,
            start,
            end,
            context
        );

        let mut window: Vec<&AnnotatedLine> = (start + 1..target)
            .rev()
            .map_while(|index| self.slots[index].line())
            .collect();
        window.reverse();
        window.extend((target..end).map_while(|index| self.slots[index].line()));

        debug!(
            "Excerpt for line {} spans {} line(s).",
            target,
            window.len()
        );
        Ok(window)
    }

    /// Renders the excerpt around `target` as text.
    ///
    /// Each line of the [`window`](Self::window) becomes one row formatted by
    /// [`AnnotatedLine::format_row`], with the `*` marker on `target`. Rows are
    /// joined with `\n` and there is no trailing newline.
    ///
    /// # Errors
    ///
    /// Fails like [`checked_line`](Self::checked_line) when `target` is not a
    /// content line.
    pub fn render(&self, target: usize, context: usize) -> Result<String, HighlightError> {
        let rows: Vec<String> = self
            .window(target, context)?
            .into_iter()
            .map(|line| line.format_row(line.index == target))
            .collect();
        Ok(rows.join("\n"))
    }
}

/// Builds the [`LineTable`] for a patch. See [`LineTable::build`].
pub fn build(patch: &str) -> LineTable {
    LineTable::build(patch)
}

/// Renders the excerpt around `target`. See [`LineTable::render`].
pub fn render(table: &LineTable, target: usize, context: usize) -> Result<String, HighlightError> {
    table.render(target, context)
}

// --- Annotator ---

/// Owns the line table of one file's patch together with how to render it.
///
/// One annotator is created per file. It is immutable, so annotators of
/// different files can be built and queried from different threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchAnnotator {
    table: LineTable,
    options: HighlightOptions,
}

impl PatchAnnotator {
    /// Builds an annotator with the default options.
    pub fn new(patch: &str) -> Self {
        Self::with_options(patch, HighlightOptions::default())
    }

    /// Builds an annotator that renders with `options`.
    pub fn with_options(patch: &str, options: HighlightOptions) -> Self {
        PatchAnnotator {
            table: LineTable::build(patch),
            options,
        }
    }

    /// Builds an annotator for the patch between two texts.
    ///
    /// See [`patch_from_texts`] for how the patch is produced.
    ///
    /// # Example
    ///
    /// ```
    /// # use diffnote::PatchAnnotator;
    /// let annotator = PatchAnnotator::from_texts("a\nb\nc\n", "a\nB\nc\n", 1);
    /// assert_eq!(annotator.table().len(), 5);
    /// assert_eq!(annotator.head_line(3)?, 2);
    /// # Ok::<(), diffnote::HighlightError>(())
    /// ```
    pub fn from_texts(old_text: &str, new_text: &str, context_len: usize) -> Self {
        Self::new(&patch_from_texts(old_text, new_text, context_len))
    }

    /// The underlying line table.
    pub fn table(&self) -> &LineTable {
        &self.table
    }

    /// The options [`highlight`](Self::highlight) renders with.
    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    /// Renders the excerpt around `target` with the annotator's options.
    pub fn highlight(&self, target: usize) -> Result<String, HighlightError> {
        self.table.render(target, self.options.context)
    }

    /// Renders the excerpt around `target` with an explicit context size.
    pub fn render(&self, target: usize, context: usize) -> Result<String, HighlightError> {
        self.table.render(target, context)
    }

    /// The head-side line number of the line at `target`.
    pub fn head_line(&self, target: usize) -> Result<usize, HighlightError> {
        self.table.head_line(target)
    }
}

// --- Patch Generation ---

/// Produces the hunks of a unified diff between two texts.
///
/// The output has the shape of the `patch` field of a compare API: hunks only,
/// without `---`/`+++` file headers. Every header spells out both lengths, even
/// for one-line ranges, so the result is always understood by
/// [`LineTable::build`]. Identical texts produce an empty string.
///
/// # Example
///
/// ```
/// # use diffnote::patch_from_texts;
/// let patch = patch_from_texts("a\nb\nc\n", "a\nB\nc\n", 3);
/// assert_eq!(patch, "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c");
/// ```
pub fn patch_from_texts(old_text: &str, new_text: &str, context_len: usize) -> String {
    let diff = TextDiff::from_lines(old_text, new_text);
    let mut lines = Vec::new();

    for group in diff.grouped_ops(context_len) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let base = first.old_range().start..last.old_range().end;
        let head = first.new_range().start..last.new_range().end;
        lines.push(format!(
            "@@ -{},{} +{},{} @@",
            range_start(&base),
            base.len(),
            range_start(&head),
            head.len()
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let marker = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                lines.push(format!("{}{}", marker, strip_line_ending(change.value())));
            }
        }
    }

    debug!("Generated patch with {} line(s).", lines.len());
    lines.join("\n")
}

/// Unified diffs number lines from 1, except that an empty range names the
/// line it follows.
fn range_start(range: &Range<usize>) -> usize {
    if range.is_empty() {
        range.start
    } else {
        range.start + 1
    }
}

fn strip_line_ending(value: &str) -> &str {
    let value = value.strip_suffix('\n').unwrap_or(value);
    value.strip_suffix('\r').unwrap_or(value)
}
