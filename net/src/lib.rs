mod error;
mod http_fetcher;
mod hub_client;
mod update_checker;

pub use error::{NetError, NetResult};
pub use http_fetcher::{polite_delay, HttpFetcher};
pub use hub_client::{HubClient, DEFAULT_API_KEY_HEADER, DEFAULT_HUB_BASE_URL};
pub use update_checker::{check_for_app_update, version_tuple, AppUpdateCheckResult, WindowsArch, GITHUB_LATEST_RELEASE_URL};
