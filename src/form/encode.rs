//! multipart/form-data serialization.
//!
//! Every call picks a fresh boundary. Part order, duplicate names,
//! filenames, content types and file bytes are written exactly as held in
//! the [`Form`].

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::form::model::{Form, FormPart};

/// A serialized form ready to be sent upstream.
#[derive(Debug, Clone)]
pub struct EncodedForm {
    boundary: String,
    body: Bytes,
}

impl EncodedForm {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `content-type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Serialize `form` with a new random boundary.
pub fn encode_form(form: &Form) -> EncodedForm {
    let boundary = format!("stt-proxy-{}", Uuid::new_v4().simple());
    encode_with_boundary(form, boundary)
}

fn encode_with_boundary(form: &Form, boundary: String) -> EncodedForm {
    let payload: usize = form
        .parts()
        .iter()
        .map(|part| match part {
            FormPart::Text { value, .. } => value.len(),
            FormPart::File { data, .. } => data.len(),
        })
        .sum();
    let mut buf = BytesMut::with_capacity(payload + form.len() * 128 + boundary.len() + 8);

    for part in form.parts() {
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\n");

        match part {
            FormPart::Text {
                name,
                value,
                content_type,
            } => {
                put_disposition(&mut buf, name, None);
                put_content_type(&mut buf, content_type.as_deref());
                buf.put_slice(b"\r\n");
                buf.put_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                filename,
                content_type,
                data,
            } => {
                put_disposition(&mut buf, name, filename.as_deref());
                put_content_type(&mut buf, content_type.as_deref());
                buf.put_slice(b"\r\n");
                buf.put_slice(data);
            }
        }
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"--\r\n");

    EncodedForm {
        boundary,
        body: buf.freeze(),
    }
}

fn put_disposition(buf: &mut BytesMut, name: &str, filename: Option<&str>) {
    buf.put_slice(b"Content-Disposition: form-data; name=\"");
    buf.put_slice(escape_quoted(name).as_bytes());
    buf.put_u8(b'"');
    if let Some(filename) = filename {
        buf.put_slice(b"; filename=\"");
        buf.put_slice(escape_quoted(filename).as_bytes());
        buf.put_u8(b'"');
    }
    buf.put_slice(b"\r\n");
}

// Only what the client declared; a missing type stays missing.
fn put_content_type(buf: &mut BytesMut, content_type: Option<&str>) {
    if let Some(content_type) = content_type {
        buf.put_slice(b"Content-Type: ");
        buf.put_slice(content_type.as_bytes());
        buf.put_slice(b"\r\n");
    }
}

// Same escaping browsers apply to names and filenames.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
