//! Line-preserving parser for Prisma schema files
//!
//! Only `model` blocks are broken down into members; everything else is kept
//! as raw text. Rendering an untouched [`Schema`] reproduces the input byte for
//! byte.

use std::fmt;

use super::SchemaError;

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Text(String),
    Model(Model),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    header: String,
    members: Vec<Member>,
    footer: String,
    /// `model X {}` on one line; split open on first insertion
    inline_empty: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Member {
    Field(Field),
    /// Block attribute, comment or blank line
    Other(String),
}

/// One field line with the columns its parts start at
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: String,
    raw: String,
    indent: String,
    type_col: usize,
    attr_col: Option<usize>,
}

impl Field {
    fn parse(raw: &str) -> Option<Self> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with("@@") {
            return None;
        }

        let indent = &line[..line.len() - trimmed.len()];
        let tokens = token_spans(line);
        let (name_start, name_end) = *tokens.first()?;
        let (type_start, type_end) = *tokens.get(1)?;
        let name = &line[name_start..name_end];
        if !is_identifier(name) {
            return None;
        }
        let attr_col = tokens
            .get(2)
            .map(|&(start, _)| start)
            .filter(|&start| line[start..].starts_with('@'));

        Some(Self {
            name: name.to_string(),
            field_type: line[type_start..type_end].to_string(),
            raw: raw.to_string(),
            indent: indent.to_string(),
            type_col: type_start,
            attr_col,
        })
    }

    fn line_ending(&self) -> &'static str {
        if self.raw.ends_with("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// A new field line laid out on this field's columns
    fn aligned(&self, name: &str, field_type: &str, attributes: Option<&str>) -> Field {
        let mut line = self.indent.clone();
        line.push_str(name);
        pad_to(&mut line, self.type_col);
        let type_col = line.len();
        line.push_str(field_type);

        let mut attr_col = None;
        if let Some(attributes) = attributes.map(str::trim).filter(|a| !a.is_empty()) {
            match self.attr_col {
                Some(col) => pad_to(&mut line, col),
                None => line.push(' '),
            }
            attr_col = Some(line.len());
            line.push_str(attributes);
        }
        line.push_str(self.line_ending());

        Field {
            name: name.to_string(),
            field_type: field_type.to_string(),
            raw: line,
            indent: self.indent.clone(),
            type_col,
            attr_col,
        }
    }
}

/// Pad with spaces up to `col`, always leaving at least one space
fn pad_to(line: &mut String, col: usize) {
    let width = col.saturating_sub(line.len()).max(1);
    line.extend(std::iter::repeat(' ').take(width));
}

fn token_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    for (i, c) in line.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if c.is_whitespace() && depth == 0 {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, line.len()));
    }
    spans
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `model Name {` → `Some("Name")`
fn model_header(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("model")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(name_end);
    (is_identifier(name) && tail.trim_start().starts_with('{')).then_some(name)
}

impl Schema {
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        let mut blocks = Vec::new();
        let mut text = String::new();
        let mut lines = source.split_inclusive('\n').enumerate();

        while let Some((index, line)) = lines.next() {
            let Some(name) = model_header(line) else {
                text.push_str(line);
                continue;
            };

            if !text.is_empty() {
                blocks.push(Block::Text(std::mem::take(&mut text)));
            }

            if line.trim_end().ends_with('}') {
                blocks.push(Block::Model(Model {
                    name: name.to_string(),
                    header: line.to_string(),
                    members: Vec::new(),
                    footer: String::new(),
                    inline_empty: true,
                }));
                continue;
            }

            let mut members = Vec::new();
            let mut footer = None;
            for (_, member) in lines.by_ref() {
                if member.trim() == "}" {
                    footer = Some(member.to_string());
                    break;
                }
                members.push(match Field::parse(member) {
                    Some(field) => Member::Field(field),
                    None => Member::Other(member.to_string()),
                });
            }

            let footer = footer.ok_or_else(|| SchemaError::Parse {
                line: index + 1,
                message: format!("model {} is never closed", name),
            })?;

            blocks.push(Block::Model(Model {
                name: name.to_string(),
                header: line.to_string(),
                members,
                footer,
                inline_empty: false,
            }));
        }

        if !text.is_empty() {
            blocks.push(Block::Text(text));
        }
        Ok(Self { blocks })
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.blocks.iter().find_map(|b| match b {
            Block::Model(m) if m.name == name => Some(m),
            _ => None,
        })
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.blocks.iter_mut().find_map(|b| match b {
            Block::Model(m) if m.name == name => Some(m),
            _ => None,
        })
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Model(m) => Some(m),
            _ => None,
        })
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            match block {
                Block::Text(text) => f.write_str(text)?,
                Block::Model(model) => model.fmt(f)?,
            }
        }
        Ok(())
    }
}

/// Where a new field went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Before(String),
    /// The anchor was absent or not given; appended after the last field
    Appended,
}

impl Model {
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(field) => Some(field),
            Member::Other(_) => None,
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields().any(|f| f.name == name)
    }

    /// Insert a field before `anchor`, or after the last field when the anchor
    /// is absent.
    pub fn insert_field(
        &mut self,
        name: &str,
        field_type: &str,
        attributes: Option<&str>,
        anchor: Option<&str>,
    ) -> Placement {
        if self.inline_empty {
            self.open_inline();
        }

        let anchor_index = anchor.and_then(|anchor| {
            self.members
                .iter()
                .position(|m| matches!(m, Member::Field(f) if f.name == anchor))
        });

        if let (Some(index), Some(anchor)) = (anchor_index, anchor) {
            let new_field = match &self.members[index] {
                Member::Field(anchor_field) => anchor_field.aligned(name, field_type, attributes),
                Member::Other(_) => return Placement::Appended,
            };
            self.members.insert(index, Member::Field(new_field));
            return Placement::Before(anchor.to_string());
        }

        let last = self
            .members
            .iter()
            .rposition(|m| matches!(m, Member::Field(_)));
        let template = match last.map(|i| &self.members[i]) {
            Some(Member::Field(field)) => field.clone(),
            _ => Field {
                name: String::new(),
                field_type: String::new(),
                raw: "\n".to_string(),
                indent: "  ".to_string(),
                type_col: 0,
                attr_col: None,
            },
        };
        let new_field = template.aligned(name, field_type, attributes);
        let at = last.map_or(0, |i| i + 1);
        self.members.insert(at, Member::Field(new_field));
        Placement::Appended
    }

    fn open_inline(&mut self) {
        let line = self.header.trim_end_matches(['\r', '\n']);
        let ending = match &self.header[line.len()..] {
            "" => "\n",
            ending => ending,
        };
        let open = line.trim_end().trim_end_matches('}').trim_end();

        let header = format!("{}\n", open);
        self.footer = format!("}}{}", ending);
        self.header = header;
        self.inline_empty = false;
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        for member in &self.members {
            match member {
                Member::Field(field) => f.write_str(&field.raw)?,
                Member::Other(raw) => f.write_str(raw)?,
            }
        }
        f.write_str(&self.footer)
    }
}
