use super::webhook;
use crate::error::{require, AppResult};
use crate::gateway::webhook::{function, MediaFile, Submission};
use crate::gateway::{BackOfficeStore, WebhookClient};
use crate::models::{Broker, BrokerId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Broker form. `id` is set when editing an existing record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerDraft {
    pub id: Option<BrokerId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license: String,
    pub description: String,
    pub photo: Option<MediaFile>,
}

impl BrokerDraft {
    pub fn edit(broker: &Broker) -> Self {
        Self {
            id: Some(broker.id),
            name: broker.name.clone(),
            email: broker.email.clone(),
            phone: broker.phone.clone().unwrap_or_default(),
            license: broker.license.clone().unwrap_or_default(),
            description: broker.description.clone().unwrap_or_default(),
            photo: None,
        }
    }

    pub fn to_submission(&self, now: DateTime<Utc>) -> AppResult<Submission> {
        require(&[("nome", self.name.as_str()), ("email", self.email.as_str())])?;

        let marker = match self.id {
            Some(_) => function::UPDATE_BROKER,
            None => function::CREATE_BROKER,
        };
        let mut submission = Submission::new(marker)
            .text_opt("id", self.id)
            .text("nome", self.name.trim())
            .text("email", self.email.trim())
            .text("numero", &self.phone)
            .text("descricao", &self.description)
            .text("creci", &self.license)
            .text(
                "fotoNome",
                self.photo.as_ref().map(|p| p.file_name.as_str()).unwrap_or_default(),
            )
            .text("data", now.to_rfc3339());
        if let Some(photo) = &self.photo {
            submission = submission.file("file", photo.clone());
        }
        Ok(submission)
    }
}

/// Case-insensitive name search; a blank query keeps everyone
pub fn search_brokers<'a>(brokers: &'a [Broker], query: &str) -> Vec<&'a Broker> {
    let needle = query.trim().to_lowercase();
    brokers
        .iter()
        .filter(|b| needle.is_empty() || b.name.to_lowercase().contains(&needle))
        .collect()
}

pub struct BrokerManager {
    store: Arc<dyn BackOfficeStore>,
    webhook: Option<Arc<WebhookClient>>,
}

impl BrokerManager {
    pub fn new(store: Arc<dyn BackOfficeStore>, webhook: Option<Arc<WebhookClient>>) -> Self {
        Self { store, webhook }
    }

    pub async fn list(&self) -> AppResult<Vec<Broker>> {
        Ok(self.store.brokers().await?)
    }

    /// Create or update through the upload webhook
    pub async fn submit(&self, draft: &BrokerDraft) -> AppResult<()> {
        let submission = draft.to_submission(Utc::now())?;
        webhook(&self.webhook)?.post(submission).await?;
        info!("Broker '{}' sent", draft.name.trim());
        Ok(())
    }

    pub async fn delete_selected(&self, ids: &[BrokerId]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.delete_brokers(ids).await?;
        info!("Deleted brokers {:?}", ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::gateway::memory::WriteOp;
    use crate::gateway::MemoryGateway;
    use crate::models::parse_timestamp;

    fn broker(id: BrokerId, name: &str) -> Broker {
        Broker {
            id,
            name: name.to_string(),
            email: format!("{}@ha.com", name.to_lowercase()),
            license: Some("12345-F".into()),
            ..Broker::default()
        }
    }

    #[test]
    fn new_broker_submission_has_create_marker_and_photo() {
        let draft = BrokerDraft {
            name: " Carla Souza ".into(),
            email: "carla@ha.com".into(),
            photo: Some(MediaFile::new("carla.jpg", "image/jpeg", vec![1])),
            ..BrokerDraft::default()
        };
        let now = parse_timestamp("2024-06-01T12:00:00Z").unwrap();
        let submission = draft.to_submission(now).unwrap();

        assert_eq!(submission.value("funcao"), Some("corretor"));
        assert_eq!(submission.value("id"), None);
        assert_eq!(submission.value("nome"), Some("Carla Souza"));
        assert_eq!(submission.value("fotoNome"), Some("carla.jpg"));
        assert_eq!(submission.value("data"), Some("2024-06-01T12:00:00+00:00"));
        assert_eq!(submission.file_count(), 1);
    }

    #[test]
    fn editing_keeps_id_and_switches_marker() {
        let draft = BrokerDraft::edit(&broker(4, "Rui"));
        let submission = draft.to_submission(Utc::now()).unwrap();
        assert_eq!(submission.value("funcao"), Some("atualizar_corretor"));
        assert_eq!(submission.value("id"), Some("4"));
        assert_eq!(submission.value("creci"), Some("12345-F"));
        assert_eq!(submission.file_count(), 0);
    }

    #[test]
    fn name_and_email_are_required() {
        let err = BrokerDraft::default().to_submission(Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref missing } if missing == &["nome", "email"]));
    }

    #[test]
    fn search_matches_name_ignoring_case() {
        let all = vec![broker(1, "Carla"), broker(2, "Marcos"), broker(3, "Rui")];
        let names: Vec<&str> = search_brokers(&all, "AR")
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names, vec!["Carla", "Marcos"]);
        assert_eq!(search_brokers(&all, "  ").len(), 3);
    }

    #[tokio::test]
    async fn deletes_only_selected_brokers() {
        let gw = Arc::new(MemoryGateway::new().with_brokers(vec![broker(1, "Carla"), broker(2, "Rui")]));
        let manager = BrokerManager::new(gw.clone(), None);

        manager.delete_selected(&[]).await.unwrap();
        manager.delete_selected(&[2]).await.unwrap();

        assert_eq!(manager.list().await.unwrap().len(), 1);
        assert_eq!(gw.writes().await, vec![WriteOp::DeleteBrokers(vec![2])]);
    }

    #[tokio::test]
    async fn submit_validates_before_webhook_lookup() {
        let manager = BrokerManager::new(Arc::new(MemoryGateway::new()), None);
        let err = manager.submit(&BrokerDraft::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
