//! `multipart/form-data` parser.
//!
//! The boundary always comes from the declared Content-Type; it is never
//! guessed from the body. multer's streaming API is driven to completion
//! over the already-buffered body, so parsing never suspends.

use bytes::Bytes;
use futures::executor::block_on;
use futures::stream;
use indexmap::IndexMap;
use serde::Serialize;

use super::{BodyParser, Format, FormatError, ParsedValue};

/// A file part. The payload stays in memory but is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
    #[serde(skip)]
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultipartData {
    /// Text fields; repeated names accumulate.
    pub fields: IndexMap<String, Vec<String>>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Copy)]
pub struct MultipartParser {
    max_fields: usize,
    max_field_size: u64,
}

impl MultipartParser {
    pub fn new(max_fields: usize, max_field_size: u64) -> Self {
        Self {
            max_fields,
            max_field_size,
        }
    }

    async fn collect(&self, mut multipart: multer::Multipart<'static>) -> Result<MultipartData, FormatError> {
        let mut data = MultipartData::default();
        let mut parts = 0;

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            parts += 1;
            if parts > self.max_fields {
                return Err(FormatError::MalformedMultipart(format!(
                    "too many parts (max {})",
                    self.max_fields
                )));
            }

            let Some(name) = field.name().map(str::to_owned) else {
                tracing::debug!("Skipping multipart part without a name");
                continue;
            };

            match field.file_name().map(str::to_owned) {
                Some(filename) => {
                    let content_type = field.content_type().map(ToString::to_string);
                    let bytes = field.bytes().await.map_err(malformed)?;
                    data.files.push(UploadedFile {
                        field: name,
                        filename,
                        content_type,
                        size: bytes.len(),
                        data: bytes,
                    });
                }
                None => {
                    let text = field.text().await.map_err(malformed)?;
                    data.fields.entry(name).or_default().push(text);
                }
            }
        }
        Ok(data)
    }
}

impl BodyParser for MultipartParser {
    fn format(&self) -> Format {
        Format::Multipart
    }

    fn parse(&self, body: &Bytes, content_type: Option<&str>) -> Result<ParsedValue, FormatError> {
        if body.is_empty() {
            return Err(FormatError::EmptyBody);
        }
        let content_type = content_type.ok_or_else(|| {
            FormatError::MalformedMultipart("missing Content-Type header, boundary is required".into())
        })?;
        let boundary = multer::parse_boundary(content_type).map_err(|e| {
            FormatError::MalformedMultipart(format!("missing or invalid boundary parameter: {e}"))
        })?;

        let constraints = multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().per_field(self.max_field_size));
        let chunk = body.clone();
        let stream = stream::once(async move { Ok::<Bytes, std::io::Error>(chunk) });
        let multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

        block_on(self.collect(multipart)).map(ParsedValue::Multipart)
    }
}

fn malformed(err: multer::Error) -> FormatError {
    FormatError::MalformedMultipart(err.to_string())
}
