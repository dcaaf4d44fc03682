//! multipart/form-data parsing for inbound transcription requests.
//!
//! Parsing goes through axum's `Multipart` extractor, so the router's
//! `DefaultBodyLimit` applies to the whole body.

use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{Request, StatusCode};

use crate::error::ProxyError;
use crate::form::model::{Form, FormPart};

/// Read the whole multipart body of `request` into a [`Form`].
///
/// `body_limit` is only used to describe a `413` in the returned error.
pub async fn read_form(request: Request<Body>, body_limit: usize) -> Result<Form, ProxyError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| ProxyError::MalformedMultipart(rejection.body_text()))?;

    let mut form = Form::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(field_error(e, body_limit)),
        };

        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| field_error(e, body_limit))?;

        // A part without a filename is a form parameter, whatever its
        // declared content type.
        let part = if filename.is_none() {
            match std::str::from_utf8(&data) {
                Ok(value) => FormPart::Text {
                    name,
                    value: value.to_string(),
                    content_type,
                },
                Err(_) => FormPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                },
            }
        } else {
            FormPart::File {
                name,
                filename,
                content_type,
                data,
            }
        };
        form.push(part);
    }

    Ok(form)
}

fn field_error(err: axum::extract::multipart::MultipartError, body_limit: usize) -> ProxyError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ProxyError::PayloadTooLarge(body_limit)
    } else {
        ProxyError::MalformedMultipart(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::encode::encode_form;
    use axum::http::header::CONTENT_TYPE;

    fn multipart_request(content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/audio/transcriptions")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn reads_text_and_file_parts() {
        let body = "--b\r\n\
Content-Disposition: form-data; name=\"model\"\r\n\r\n\
whisper-tiny\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"clip.wav\"\r\n\
Content-Type: audio/wav\r\n\r\n\
RIFFdata\r\n\
--b--\r\n";

        let form = read_form(multipart_request("multipart/form-data; boundary=b", body), 1024)
            .await
            .unwrap();

        assert_eq!(
            form.parts(),
            &[
                FormPart::text("model", "whisper-tiny"),
                FormPart::file("file", "clip.wav", "audio/wav", &b"RIFFdata"[..]),
            ]
        );
    }

    #[tokio::test]
    async fn reads_back_what_the_encoder_writes() {
        let audio: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let original: Form = [
            FormPart::text("prompt", "会议记录"),
            FormPart::file("file", "meeting.mp3", "audio/mpeg", audio),
            FormPart::text("prompt", "second"),
        ]
        .into_iter()
        .collect();

        let encoded = encode_form(&original);
        let request = multipart_request(&encoded.content_type(), encoded.into_body());
        let parsed = read_form(request, usize::MAX).await.unwrap();

        assert_eq!(parsed, original);
    }

    #[tokio::test]
    async fn typed_part_without_filename_is_text() {
        let body = "--b\r\n\
Content-Disposition: form-data; name=\"language\"\r\n\
Content-Type: text/plain\r\n\r\n\
en\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.wav\"\r\n\r\n\
RIFF\r\n\
--b--\r\n";

        let form = read_form(multipart_request("multipart/form-data; boundary=b", body), 1024)
            .await
            .unwrap();

        assert_eq!(
            form.parts(),
            &[
                FormPart::Text {
                    name: "language".into(),
                    value: "en".into(),
                    content_type: Some("text/plain".into()),
                },
                FormPart::File {
                    name: "file".into(),
                    filename: Some("a.wav".into()),
                    content_type: None,
                    data: bytes::Bytes::from_static(b"RIFF"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn filename_without_type_survives_a_round_trip() {
        let original: Form = [FormPart::File {
            name: "file".into(),
            filename: Some("a.wav".into()),
            content_type: None,
            data: bytes::Bytes::from_static(b"RIFF\x00\xff"),
        }]
        .into_iter()
        .collect();

        let encoded = encode_form(&original);
        let request = multipart_request(&encoded.content_type(), encoded.into_body());
        let parsed = read_form(request, usize::MAX).await.unwrap();

        assert_eq!(parsed, original);
    }

    #[tokio::test]
    async fn non_multipart_body_is_rejected() {
        let err = read_form(multipart_request("application/json", "{}"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::MalformedMultipart(_)));
    }

    #[tokio::test]
    async fn truncated_body_is_rejected() {
        let body = "--b\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\nwhis";
        let err = read_form(multipart_request("multipart/form-data; boundary=b", body), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::MalformedMultipart(_)));
    }
}
