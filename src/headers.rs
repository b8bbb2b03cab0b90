use axum::http;
use headers::{Header, HeaderName, HeaderValue};

/// Header name remove.bg reads the API key from.
pub static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// `X-Api-Key` credential header sent to the provider.
#[derive(Clone, Eq, PartialEq)]
pub struct XApiKey(pub String);

impl std::fmt::Debug for XApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("XApiKey(***)")
    }
}

impl Header for XApiKey {
    fn name() -> &'static HeaderName {
        &X_API_KEY
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(headers::Error::invalid)?;
        let key = value.to_str().map_err(|_| headers::Error::invalid())?.trim();
        if key.is_empty() {
            return Err(headers::Error::invalid());
        }
        Ok(XApiKey(key.to_string()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Ok(mut value) = HeaderValue::from_str(&self.0) {
            value.set_sensitive(true);
            values.extend(std::iter::once(value));
        }
    }
}

/// `Content-Disposition: attachment; filename="..."`.
///
/// The `headers` crate only builds the `inline` form, so the attachment
/// variant used for download responses lives here.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Attachment {
    pub filename: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

impl Header for Attachment {
    fn name() -> &'static HeaderName {
        &http::header::CONTENT_DISPOSITION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(headers::Error::invalid)?;
        let value = value.to_str().map_err(|_| headers::Error::invalid())?;

        let mut parts = value.split(';').map(str::trim);
        if !parts
            .next()
            .is_some_and(|kind| kind.eq_ignore_ascii_case("attachment"))
        {
            return Err(headers::Error::invalid());
        }

        let filename = parts
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("filename"))
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .ok_or_else(headers::Error::invalid)?;

        Ok(Attachment { filename })
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let escaped = self.filename.replace('\\', "\\\\").replace('"', "\\\"");
        let value = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped));
        if let Ok(value) = value {
            values.extend(std::iter::once(value));
        }
    }
}
