use crate::error::{GatewayError, GatewayResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Marker the webhook uses to route a submission
pub mod function {
    pub const CREATE_LISTING: &str = "cadastro imoveis";
    pub const UPDATE_LISTING: &str = "atualizar_imovel";
    pub const CREATE_BROKER: &str = "corretor";
    pub const UPDATE_BROKER: &str = "atualizar_corretor";
    pub const PROFILE: &str = "perfil";
}

/// File attached to a submission
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing the content type from its extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = guess_mime(&file_name).to_string();
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    pub fn is_video(&self) -> bool {
        self.mime.starts_with("video/")
    }
}

fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// One multipart field, kept inspectable until it is sent
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Text { name: String, value: String },
    File { name: String, file: MediaFile },
}

/// Ordered multipart payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    fields: Vec<FormField>,
}

impl Submission {
    pub fn new(function: &str) -> Self {
        Self::default().text("funcao", function)
    }

    pub fn text(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.push(FormField::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Adds the field only when a value is present
    pub fn text_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub fn file(mut self, name: &str, file: MediaFile) -> Self {
        self.fields.push(FormField::File {
            name: name.to_string(),
            file,
        });
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// First text value stored under `name`
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match field {
            FormField::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn file_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| matches!(f, FormField::File { .. }))
            .count()
    }

    fn into_form(self) -> GatewayResult<Form> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field {
                FormField::Text { name, value } => form.text(name, value),
                FormField::File { name, file } => {
                    let part = Part::bytes(file.bytes)
                        .file_name(file.file_name)
                        .mime_str(&file.mime)?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Posts multipart submissions to the configured upload webhook.
/// The response body is opaque; only the status is observed.
pub struct WebhookClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(url: &str, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
        })
    }

    pub async fn post(&self, submission: Submission) -> GatewayResult<()> {
        let function = submission.value("funcao").unwrap_or("-").to_string();
        info!(
            "Posting '{}' submission with {} file(s) to webhook",
            function,
            submission.file_count()
        );

        let form = submission.into_form()?;
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.timeout)
                } else {
                    GatewayError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Webhook returned status: {}", status);
            return Err(GatewayError::Status {
                table: "webhook".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("Webhook accepted '{}' submission", function);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_starts_with_function_marker() {
        let submission = Submission::new(function::CREATE_BROKER)
            .text("nome", "Carla")
            .text_opt("creci", None::<String>)
            .file("file", MediaFile::new("carla.png", "image/png", vec![1, 2, 3]));

        assert_eq!(submission.value("funcao"), Some("corretor"));
        assert_eq!(submission.value("nome"), Some("Carla"));
        assert_eq!(submission.value("creci"), None);
        assert_eq!(submission.file_count(), 1);
        assert_eq!(submission.fields().len(), 3);
    }

    #[test]
    fn guesses_media_types() {
        assert_eq!(guess_mime("tour.MP4"), "video/mp4");
        assert_eq!(guess_mime("sala.jpeg"), "image/jpeg");
        assert_eq!(guess_mime("planta"), "application/octet-stream");
        assert!(MediaFile::new("a.mov", guess_mime("a.mov"), vec![]).is_video());
    }

    #[test]
    fn bad_mime_is_reported_when_building_form() {
        let submission = Submission::new(function::CREATE_LISTING)
            .file("foto", MediaFile::new("x", "not a mime", vec![]));
        assert!(submission.into_form().is_err());
    }
}
