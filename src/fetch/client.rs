use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Wrappers can decorate requests before passing them on.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
