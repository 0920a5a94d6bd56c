//! The three request shapes hosting sites accept.

use std::{path::PathBuf, time::Duration};

use futures::StreamExt;
use reqwest::{header, multipart, Body, Client, Method};
use tokio_util::io::ReaderStream;

use crate::error::{Result, UploadError};

/// What gets uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    File { path: PathBuf, size: u64 },
    Text(String),
}

impl Payload {
    pub fn file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path).map_err(|source| UploadError::Io { path: path.clone(), source })?.len();
        Ok(Payload::File { path, size })
    }

    pub fn size(&self) -> u64 {
        match self {
            Payload::File { size, .. } => *size,
            Payload::Text(text) => text.len() as u64,
        }
    }

    /// The name sent to the site: the base name of a file, a fixed name for text.
    pub fn file_name(&self) -> String {
        match self {
            Payload::File { path, .. } => path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default(),
            Payload::Text(_) => "paste.txt".to_string(),
        }
    }

    /// The whole content, for sites taking it as a form field.
    async fn read_to_string(&self) -> Result<String> {
        match self {
            Payload::File { path, .. } => {
                tokio::fs::read_to_string(path).await.map_err(|source| UploadError::Io { path: path.clone(), source })
            }
            Payload::Text(text) => Ok(text.clone()),
        }
    }

    /// The content as a request body, throttled to `limit_rate` KiB/s (0 for no limit).
    async fn body(&self, limit_rate: u32) -> Result<Body> {
        match self {
            Payload::Text(text) => Ok(Body::from(text.clone())),
            Payload::File { path, .. } => {
                let file = tokio::fs::File::open(path).await.map_err(|source| UploadError::Io { path: path.clone(), source })?;
                let stream = ReaderStream::new(file);
                if limit_rate == 0 {
                    return Ok(Body::wrap_stream(stream));
                }
                let per_byte = Duration::from_secs_f64(1.0 / (f64::from(limit_rate) * 1024.0));
                Ok(Body::wrap_stream(stream.then(move |chunk| async move {
                    if let Ok(bytes) = &chunk {
                        tokio::time::sleep(per_byte.mul_f64(bytes.len() as f64)).await;
                    }
                    chunk
                })))
            }
        }
    }
}

/// Settings shared by every site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostConfig {
    /// Don't send the user name to sites that accept one.
    pub anonymous: bool,
    /// Soft upload rate cap in KiB/s, 0 for none.
    pub limit_rate: u32,
}

/// Where the request goes.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Fixed(String),
    /// Built from the uploaded file name.
    PerFile(fn(&str) -> String),
}

impl Endpoint {
    pub fn url(&self, file_name: &str) -> String {
        match self {
            Endpoint::Fixed(url) => url.clone(),
            Endpoint::PerFile(build) => build(file_name),
        }
    }
}

/// A form field holding the user name, replaced by `anonymous` when posting anonymously.
#[derive(Debug, Clone)]
pub struct UserField {
    pub name: &'static str,
    pub anonymous: &'static str,
}

pub type Fields = Vec<(&'static str, String)>;

fn fields(pairs: &[(&'static str, &str)]) -> Fields {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

#[derive(Debug, Clone)]
pub enum Poster {
    /// A `multipart/form-data` POST with the content as one file part.
    Multipart {
        endpoint: Endpoint,
        file_field: &'static str,
        fields: Fields,
        /// Extra fields computed from the file name.
        file_fields: Option<fn(&str) -> Fields>,
    },
    /// The raw content as body, with its Content-Length.
    Raw { method: Method, endpoint: Endpoint },
    /// A url-encoded form with the whole content in one field.
    Form {
        endpoint: Endpoint,
        content_field: &'static str,
        fields: Fields,
        user_field: Option<UserField>,
    },
}

impl Poster {
    pub fn multipart(url: impl Into<String>, file_field: &'static str, extra: &[(&'static str, &str)]) -> Self {
        Poster::Multipart { endpoint: Endpoint::Fixed(url.into()), file_field, fields: fields(extra), file_fields: None }
    }

    pub fn raw(method: Method, endpoint: Endpoint) -> Self {
        Poster::Raw { method, endpoint }
    }

    pub fn form(url: impl Into<String>, content_field: &'static str, extra: &[(&'static str, &str)]) -> Self {
        Poster::Form { endpoint: Endpoint::Fixed(url.into()), content_field, fields: fields(extra), user_field: None }
    }

    pub fn with_file_fields(mut self, build: fn(&str) -> Fields) -> Self {
        if let Poster::Multipart { file_fields, .. } = &mut self {
            *file_fields = Some(build);
        }
        self
    }

    pub fn with_user_field(mut self, name: &'static str, anonymous: &'static str) -> Self {
        if let Poster::Form { user_field, .. } = &mut self {
            *user_field = Some(UserField { name, anonymous });
        }
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Poster::Multipart { endpoint, .. } | Poster::Raw { endpoint, .. } | Poster::Form { endpoint, .. } => endpoint,
        }
    }

    /// Send the payload and return the answer body.
    pub async fn post(&self, client: &Client, config: &PostConfig, payload: &Payload) -> Result<String> {
        let file_name = payload.file_name();
        let request = match self {
            Poster::Multipart { endpoint, file_field, fields, file_fields } => {
                let part = multipart::Part::stream_with_length(payload.body(config.limit_rate).await?, payload.size()).file_name(file_name.clone());
                let mut form = multipart::Form::new().part(*file_field, part);
                let extra = file_fields.map(|build| build(&file_name)).unwrap_or_default();
                for (key, value) in fields.iter().chain(extra.iter()) {
                    form = form.text(*key, value.clone());
                }
                client.post(endpoint.url(&file_name)).multipart(form)
            }
            Poster::Raw { method, endpoint } => client
                .request(method.clone(), endpoint.url(&file_name))
                .header(header::CONTENT_LENGTH, payload.size())
                .body(payload.body(config.limit_rate).await?),
            Poster::Form { endpoint, content_field, fields, user_field } => {
                let mut values = fields.clone();
                if let Some(user) = user_field {
                    let name = if config.anonymous { user.anonymous.to_string() } else { std::env::var("USER").unwrap_or_default() };
                    values.push((user.name, name));
                }
                values.push((*content_field, payload.read_to_string().await?));
                client.post(endpoint.url(&file_name)).form(&values)
            }
        };

        log::debug!("Posting {} bytes of {}", payload.size(), file_name);
        let answer = request.send().await?.error_for_status()?.text().await?;
        if answer.is_empty() && matches!(self, Poster::Form { .. }) {
            return Err(UploadError::EmptyResponse);
        }
        Ok(answer)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use axum::{body::Bytes, http::HeaderMap, routing::any, Router};
    use pretty_assertions::assert_eq;

    /// Serve `router` on a free local port, returning its base url.
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{}", address)
    }

    /// Answers with the request method, content type and body.
    async fn echo() -> String {
        serve(Router::new().fallback(|method: Method, headers: HeaderMap, body: Bytes| async move {
            let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
            let length = headers.get(header::CONTENT_LENGTH).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
            format!("{} {} {}\n{}", method, length, content_type, String::from_utf8_lossy(&body))
        }))
        .await
    }

    #[tokio::test]
    async fn test_raw_sets_content_length() {
        let base = echo().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "some notes").unwrap();

        let poster = Poster::raw(Method::PUT, Endpoint::Fixed(format!("{}/notes.txt", base)));
        let answer = poster.post(&Client::new(), &PostConfig::default(), &Payload::file(&path).unwrap()).await.unwrap();
        assert_eq!(answer, "PUT 10 \nsome notes");
    }

    #[tokio::test]
    async fn test_multipart_carries_file_and_fields() {
        let base = echo().await;
        let poster = Poster::multipart(format!("{}/upload", base), "file[]", &[("adult", "no")]);
        let answer = poster.post(&Client::new(), &PostConfig::default(), &Payload::Text("hello".into())).await.unwrap();
        assert!(answer.starts_with("POST "));
        assert!(answer.contains("multipart/form-data; boundary="));
        assert!(answer.contains("filename=\"paste.txt\""));
        assert!(answer.contains("\r\n\r\nhello\r\n"));
        assert!(answer.contains("name=\"adult\"\r\n\r\nno"));
    }

    #[tokio::test]
    async fn test_form_user_field() {
        let base = echo().await;
        let poster = Poster::form(format!("{}/", base), "content", &[("syntax", "text")]).with_user_field("poster", "Anonymous");
        let config = PostConfig { anonymous: true, ..Default::default() };
        let answer = poster.post(&Client::new(), &config, &Payload::Text("a b".into())).await.unwrap();
        assert!(answer.ends_with("\nsyntax=text&poster=Anonymous&content=a+b"));
    }

    #[tokio::test]
    async fn test_form_empty_answer_is_an_error() {
        let base = serve(Router::new().route("/", any(|| async { "" }))).await;
        let poster = Poster::form(format!("{}/", base), "content", &[]);
        let err = poster.post(&Client::new(), &PostConfig::default(), &Payload::Text("x".into())).await.unwrap_err();
        assert_eq!(err.to_string(), "POST output empty");
    }
}
