use std::sync::Arc;

use kwi_service::KwiService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<KwiService>,
}
impl AppState {
	pub async fn new(config: kwi_config::Config) -> color_eyre::Result<Self> {
		let store = kwi_storage::open(&config.storage).await?;
		let service = KwiService::new(config, store)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: KwiService) -> Self {
		Self { service: Arc::new(service) }
	}
}
