use crate::error::AppResult;
use crate::gateway::BackOfficeStore;
use crate::models::{AnalysisRequest, RequestStatus};
use std::sync::Arc;
use tracing::info;

/// Match on id, title (ignoring case) or price text
pub fn search_requests<'a>(requests: &'a [AnalysisRequest], query: &str) -> Vec<&'a AnalysisRequest> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return requests.iter().collect();
    }
    requests
        .iter()
        .filter(|r| {
            r.id.to_string().contains(&needle)
                || r.title
                    .as_deref()
                    .map_or(false, |t| t.to_lowercase().contains(&needle))
                || r.price.as_deref().map_or(false, |p| p.contains(&needle))
        })
        .collect()
}

/// Review queue of listings sent from the public contact page
pub struct AnalysisQueue {
    store: Arc<dyn BackOfficeStore>,
}

impl AnalysisQueue {
    pub fn new(store: Arc<dyn BackOfficeStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<AnalysisRequest>> {
        Ok(self.store.analysis_requests().await?)
    }

    pub async fn pending(&self) -> AppResult<Vec<AnalysisRequest>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .collect())
    }

    pub async fn detail(&self, id: i64) -> AppResult<AnalysisRequest> {
        Ok(self.store.analysis_request(id).await?)
    }

    /// Mark a reviewed request as forwarded
    pub async fn mark_sent(&self, id: i64) -> AppResult<()> {
        self.store.set_request_status(id, RequestStatus::Sent).await?;
        info!("Analysis request {} marked as sent", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::WriteOp;
    use crate::gateway::MemoryGateway;

    fn request(id: i64, title: &str, price: &str) -> AnalysisRequest {
        AnalysisRequest {
            id,
            title: Some(title.to_string()),
            price: Some(price.to_string()),
            ..AnalysisRequest::default()
        }
    }

    #[test]
    fn searches_id_title_and_price() {
        let all = vec![
            request(15, "Casa térrea", "450000"),
            request(21, "Apartamento Centro", "320000"),
            request(3, "Sobrado", "1500000"),
        ];
        let ids = |q: &str| search_requests(&all, q).iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids("CASA"), vec![15]);
        assert_eq!(ids("21"), vec![21]);
        assert_eq!(ids("1500"), vec![3]);
        assert_eq!(ids(""), vec![15, 21, 3]);
        assert!(ids("cobertura").is_empty());
    }

    #[tokio::test]
    async fn mark_sent_updates_status() {
        let gw = Arc::new(MemoryGateway::new().with_requests(vec![
            request(1, "Casa", "100"),
            request(2, "Apto", "200"),
        ]));
        let queue = AnalysisQueue::new(gw.clone());

        queue.mark_sent(2).await.unwrap();

        assert_eq!(queue.detail(2).await.unwrap().status, RequestStatus::Sent);
        let pending: Vec<i64> = queue.pending().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(pending, vec![1]);
        assert_eq!(
            gw.writes().await,
            vec![WriteOp::SetRequestStatus { id: 2, status: "enviado".into() }]
        );
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let queue = AnalysisQueue::new(Arc::new(MemoryGateway::new()));
        assert!(queue.detail(9).await.is_err());
        assert!(queue.mark_sent(9).await.is_err());
    }
}
