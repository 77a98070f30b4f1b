use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends one prepared request. Implemented by the real client and by every
/// credential wrapper, so wrappers stack.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
