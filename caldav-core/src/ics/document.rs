//! Ordered content-line model of an iCalendar document.
//!
//! Every content line keeps the exact bytes it was parsed from (including
//! folded continuations and its line terminator), so lines that are not
//! touched by a mutation serialize back byte-for-byte. Property and block
//! names are matched case-insensitively.

use std::fmt;

use super::fold::{fold, unfold};
use crate::error::{CalDavError, CalDavResult};

/// One logical content line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    raw: String,
    logical: String,
}

impl ContentLine {
    fn from_raw(raw: String) -> Self {
        let logical = unfold(raw.trim_end_matches(['\r', '\n']));
        ContentLine { raw, logical }
    }

    fn from_logical(logical: &str, line_ending: &str) -> Self {
        let mut raw = fold(logical);
        if line_ending != "\r\n" {
            raw = raw.replace("\r\n", line_ending);
        }
        raw.push_str(line_ending);
        ContentLine {
            raw,
            logical: logical.to_string(),
        }
    }

    /// Swap the content while keeping this line's own terminator.
    fn replace_logical(&mut self, logical: &str) {
        let terminator_len = self.raw.len() - self.raw.trim_end_matches(['\r', '\n']).len();
        let terminator = self.raw[self.raw.len() - terminator_len..].to_string();
        let ending = if terminator.is_empty() { "\r\n" } else { terminator.as_str() };

        let mut raw = fold(logical);
        if ending != "\r\n" {
            raw = raw.replace("\r\n", ending);
        }
        raw.push_str(&terminator);

        self.raw = raw;
        self.logical = logical.to_string();
    }

    /// Unfolded text without the line terminator.
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Exact bytes as they appear in the document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Property name: everything before the first `;` or `:`.
    pub fn name(&self) -> &str {
        let end = self
            .logical
            .find([';', ':'])
            .unwrap_or(self.logical.len());
        &self.logical[..end]
    }

    pub fn is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// Parameter segment without the leading `;`, empty when absent.
    pub fn params(&self) -> &str {
        let name_end = self.name().len();
        let value_colon = self.value_colon().unwrap_or(self.logical.len());
        if value_colon > name_end && self.logical[name_end..].starts_with(';') {
            &self.logical[name_end + 1..value_colon]
        } else {
            ""
        }
    }

    /// Value after the separating colon, empty when the line has no colon.
    pub fn value(&self) -> &str {
        match self.value_colon() {
            Some(idx) => &self.logical[idx + 1..],
            None => "",
        }
    }

    /// Position of the colon that separates name/params from the value.
    /// Colons inside double-quoted parameter values do not count.
    fn value_colon(&self) -> Option<usize> {
        let mut in_quotes = false;
        for (idx, c) in self.logical.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                ':' if !in_quotes => return Some(idx),
                _ => {}
            }
        }
        None
    }

    fn begins(&self, block: &str) -> bool {
        self.is("BEGIN") && self.value().trim().eq_ignore_ascii_case(block)
    }

    fn ends(&self, block: &str) -> bool {
        self.is("END") && self.value().trim().eq_ignore_ascii_case(block)
    }

    fn is_begin(&self) -> bool {
        self.is("BEGIN") && self.logical.contains(':')
    }

    fn is_end(&self) -> bool {
        self.is("END") && self.logical.contains(':')
    }
}

/// A parsed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: String,
    pub value: String,
}

impl Property {
    fn from_line(line: &ContentLine) -> Self {
        Property {
            name: line.name().to_ascii_uppercase(),
            params: line.params().to_string(),
            value: line.value().trim().to_string(),
        }
    }

    /// Look up one parameter (`TZID`, `VALUE`, `CN`, ...), unquoted.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.split(';').find_map(|segment| {
            let (k, v) = segment.split_once('=')?;
            k.trim()
                .eq_ignore_ascii_case(key)
                .then(|| v.trim().trim_matches('"'))
        })
    }

    /// `params:value` when parameters are present, otherwise just the value.
    pub fn to_wire(&self) -> String {
        if self.params.is_empty() {
            self.value.clone()
        } else {
            format!("{}:{}", self.params, self.value)
        }
    }
}

/// Read-only view of the lines between a `BEGIN:<name>` and its `END:<name>`.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    lines: &'a [ContentLine],
}

impl<'a> Block<'a> {
    /// Properties that belong to this block itself, not to nested blocks.
    fn own_lines(&self) -> impl Iterator<Item = &'a ContentLine> + 'a {
        let mut depth = 0usize;
        self.lines.iter().filter(move |line| {
            if line.is_begin() {
                depth += 1;
                return false;
            }
            if line.is_end() {
                depth = depth.saturating_sub(1);
                return false;
            }
            depth == 0
        })
    }

    /// First occurrence of a property, unfolded and trimmed, as `params:value`
    /// or plain `value`.
    pub fn get_property(&self, name: &str) -> Option<String> {
        self.property(name).map(|p| p.to_wire())
    }

    pub fn property(&self, name: &str) -> Option<Property> {
        self.own_lines()
            .find(|line| line.is(name))
            .map(Property::from_line)
    }

    /// Every occurrence of a property (e.g. all ATTENDEE lines).
    pub fn properties(&self, name: &str) -> Vec<Property> {
        self.own_lines()
            .filter(|line| line.is(name))
            .map(Property::from_line)
            .collect()
    }

    /// Nested blocks with the given name (e.g. VALARM inside VEVENT).
    pub fn blocks(&self, name: &str) -> Vec<Block<'a>> {
        find_blocks(self.lines, name)
            .into_iter()
            .map(|(begin, end)| Block {
                lines: &self.lines[begin + 1..end],
            })
            .collect()
    }

    pub fn lines(&self) -> &'a [ContentLine] {
        self.lines
    }
}

impl fmt::Display for Block<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines {
            f.write_str(&line.raw)?;
        }
        Ok(())
    }
}

/// Indices of every `BEGIN:<name>` and its matching `END:<name>`, outermost
/// only. An unterminated block ends the scan.
fn find_blocks(lines: &[ContentLine], name: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        if !lines[idx].begins(name) {
            idx += 1;
            continue;
        }
        let begin = idx;
        let mut depth = 0usize;
        let mut end = None;
        for (offset, line) in lines[begin..].iter().enumerate() {
            if line.begins(name) {
                depth += 1;
            } else if line.ends(name) {
                depth -= 1;
                if depth == 0 {
                    end = Some(begin + offset);
                    break;
                }
            }
        }
        match end {
            Some(end) => {
                ranges.push((begin, end));
                idx = end + 1;
            }
            None => break,
        }
    }

    ranges
}

/// An iCalendar document as an ordered list of content lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcalDocument {
    lines: Vec<ContentLine>,
    line_ending: &'static str,
}

impl IcalDocument {
    /// Split text into content lines. Never fails: unknown content is kept
    /// as opaque lines.
    pub fn parse(text: &str) -> Self {
        let line_ending = if text.contains("\r\n") || !text.contains('\n') {
            "\r\n"
        } else {
            "\n"
        };

        let mut raws: Vec<String> = Vec::new();
        for physical in text.split_inclusive('\n') {
            let continuation = physical.starts_with([' ', '\t']);
            match raws.last_mut() {
                Some(previous) if continuation => previous.push_str(physical),
                _ => raws.push(physical.to_string()),
            }
        }

        IcalDocument {
            lines: raws.into_iter().map(ContentLine::from_raw).collect(),
            line_ending,
        }
    }

    /// Build a document from logical lines, folded and CRLF-terminated.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        IcalDocument {
            lines: lines
                .into_iter()
                .map(|line| ContentLine::from_logical(line.as_ref(), "\r\n"))
                .collect(),
            line_ending: "\r\n",
        }
    }

    pub fn lines(&self) -> &[ContentLine] {
        &self.lines
    }

    /// First block with this name. Later same-named blocks are ignored.
    pub fn block(&self, name: &str) -> Option<Block<'_>> {
        self.blocks(name).into_iter().next()
    }

    /// Every outermost block with this name.
    pub fn blocks(&self, name: &str) -> Vec<Block<'_>> {
        find_blocks(&self.lines, name)
            .into_iter()
            .map(|(begin, end)| Block {
                lines: &self.lines[begin + 1..end],
            })
            .collect()
    }

    /// Raw text between the first `BEGIN:<name>` and its `END:<name>`.
    pub fn extract_block(&self, name: &str) -> Option<String> {
        self.block(name).map(|block| block.to_string())
    }

    fn require_block(&self, name: &str) -> CalDavResult<(usize, usize)> {
        find_blocks(&self.lines, name)
            .into_iter()
            .next()
            .ok_or_else(|| CalDavError::Parse(format!("no {} block in calendar data", name)))
    }

    /// Indices of the first `block`'s own lines named `name`, skipping nested
    /// blocks, plus the index of the block's `END` line.
    fn own_property_indices(&self, block: &str, name: &str) -> CalDavResult<(Vec<usize>, usize)> {
        let (begin, end) = self.require_block(block)?;

        let mut depth = 0usize;
        let mut found = Vec::new();
        for idx in begin + 1..end {
            let line = &self.lines[idx];
            if line.is_begin() {
                depth += 1;
            } else if line.is_end() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && line.is(name) {
                found.push(idx);
            }
        }

        Ok((found, end))
    }

    /// Replace a property of the first `block`, keeping its parameters, or
    /// append `NAME:value` right before the block's `END` when missing.
    ///
    /// `value` is written verbatim; text values must already be escaped.
    pub fn set_property(&mut self, block: &str, name: &str, value: &str) -> CalDavResult<()> {
        let (found, end) = self.own_property_indices(block, name)?;

        match found.first() {
            Some(&idx) => {
                let line = &mut self.lines[idx];
                let params = line.params().to_string();
                let existing_name = line.name().to_string();
                let logical = if params.is_empty() {
                    format!("{}:{}", existing_name, value)
                } else {
                    format!("{};{}:{}", existing_name, params, value)
                };
                line.replace_logical(&logical);
            }
            None => {
                let line = ContentLine::from_logical(&format!("{}:{}", name, value), self.line_ending);
                self.lines.insert(end, line);
            }
        }

        Ok(())
    }

    /// Replace the whole line (parameters included) of a property of the first
    /// `block` with `logical`, or append it before the block's `END`.
    pub fn replace_property_line(
        &mut self,
        block: &str,
        name: &str,
        logical: &str,
    ) -> CalDavResult<()> {
        let (found, end) = self.own_property_indices(block, name)?;

        match found.first() {
            Some(&idx) => self.lines[idx].replace_logical(logical),
            None => {
                let line = ContentLine::from_logical(logical, self.line_ending);
                self.lines.insert(end, line);
            }
        }

        Ok(())
    }

    /// Delete the first `block`'s own lines named `name`. Nested blocks and
    /// later same-named blocks are untouched.
    pub fn remove_property(&mut self, block: &str, name: &str) -> CalDavResult<usize> {
        let (found, _) = self.own_property_indices(block, name)?;
        for idx in found.iter().rev() {
            self.lines.remove(*idx);
        }
        Ok(found.len())
    }

    /// Delete every line named `name`, anywhere in the document.
    pub fn remove_all_properties(&mut self, name: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| !line.is(name));
        before - self.lines.len()
    }

    /// Delete every `BEGIN:<name>` ... `END:<name>` region.
    pub fn remove_all_blocks(&mut self, name: &str) -> usize {
        let ranges = find_blocks(&self.lines, name);
        for (begin, end) in ranges.iter().rev() {
            self.lines.drain(*begin..=*end);
        }
        ranges.len()
    }

    /// Insert logical lines, in order, right before the first `block`'s `END`.
    pub fn insert_before_end<I, S>(&mut self, block: &str, lines: I) -> CalDavResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (_, end) = self.require_block(block)?;
        let new_lines: Vec<ContentLine> = lines
            .into_iter()
            .map(|line| ContentLine::from_logical(line.as_ref(), self.line_ending))
            .collect();
        self.lines.splice(end..end, new_lines);
        Ok(())
    }
}

impl fmt::Display for IcalDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            f.write_str(&line.raw)?;
        }
        Ok(())
    }
}
