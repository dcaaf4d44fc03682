//! In-memory multipart form.
//!
//! A form is an ordered list of parts. Duplicate names are legal and kept
//! in arrival order. Binary content is held as [`Bytes`], so copying a part
//! into a rewritten form never copies the payload.

use bytes::Bytes;

/// One named part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// UTF-8 parameter without a filename (`language=en`). A declared
    /// content type (`text/plain`) is kept for re-encoding.
    Text {
        name: String,
        value: String,
        content_type: Option<String>,
    },
    /// Anything carrying a filename, or non-UTF-8 data. Forwarded byte for
    /// byte.
    File {
        name: String,
        filename: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.into(),
            value: value.into(),
            content_type: None,
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        FormPart::File {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FormPart::File { .. })
    }

    /// Text value, `None` for file parts.
    pub fn text_value(&self) -> Option<&str> {
        match self {
            FormPart::Text { value, .. } => Some(value),
            FormPart::File { .. } => None,
        }
    }
}

/// Ordered multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    parts: Vec<FormPart>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parts: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, part: FormPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// First text value for `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .filter(|p| p.name() == name)
            .find_map(FormPart::text_value)
    }

    /// All text values for `name`, in order.
    pub fn text_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.parts
            .iter()
            .filter(move |p| p.name() == name)
            .filter_map(FormPart::text_value)
    }

    pub fn files(&self) -> impl Iterator<Item = &FormPart> {
        self.parts.iter().filter(|p| p.is_file())
    }
}

impl FromIterator<FormPart> for Form {
    fn from_iter<I: IntoIterator<Item = FormPart>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Form {
    type Item = FormPart;
    type IntoIter = std::vec::IntoIter<FormPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}
