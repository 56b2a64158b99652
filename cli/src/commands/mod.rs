pub mod check;
pub mod generate;
pub mod tools;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
