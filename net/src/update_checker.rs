use serde_json::Value;

use crate::http_fetcher::HttpFetcher;

pub const GITHUB_LATEST_RELEASE_URL: &str = "https://api.github.com/repos/michaldziwisz/programista/releases/latest";
const CACHE_KEY_LATEST_RELEASE: &str = "app_update/github_latest_release_v1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WindowsArch {
    X64,
    Arm64,
    Unknown,
}

impl WindowsArch {
    pub fn detect(machine: &str) -> Self {
        match machine.to_uppercase().as_str() {
            "ARM64" | "AARCH64" => WindowsArch::Arm64,
            "AMD64" | "X86_64" => WindowsArch::X64,
            _ => WindowsArch::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppUpdateCheckResult {
    pub current_version: String,
    pub latest_version: Option<String>,
    pub update_available: bool,
    pub release_url: Option<String>,
    pub installer_name: Option<String>,
    pub installer_url: Option<String>,
    pub message: String,
}

/// Strips a leading `v`/`V`, keeps the leading `N(.N){0,3}` run, pads with
/// zeros (spec §3 [NEW] pure helper, lifted from `app_updates.py`).
pub fn version_tuple(version: &str) -> (u32, u32, u32, u32) {
    let v = version.trim().trim_start_matches(['v', 'V']);
    let core: String = v
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()
        .unwrap_or("")
        .to_owned();
    let mut parts: Vec<u32> = core.split('.').filter(|p| !p.is_empty()).filter_map(|p| p.parse().ok()).collect();
    parts.resize(4, 0);
    (parts[0], parts[1], parts[2], parts[3])
}

fn pick_windows_installer_asset(assets: &[Value], arch: WindowsArch) -> (Option<String>, Option<String>) {
    let candidates: &[&str] = match arch {
        WindowsArch::Arm64 => &[
            "programista-win-arm64.msi",
            "programista-win-arm64.exe",
            "programista-win-x64.msi",
            "programista.exe",
        ],
        WindowsArch::X64 | WindowsArch::Unknown => &[
            "programista-win-x64.msi",
            "programista-win-x64.exe",
            "programista.exe",
        ],
    };

    for name in candidates {
        for asset in assets {
            if asset.get("name").and_then(Value::as_str) != Some(*name) {
                continue;
            }
            if let Some(url) = asset.get("browser_download_url").and_then(Value::as_str) {
                return (Some((*name).to_owned()), Some(url.to_owned()));
            }
        }
    }
    (None, None)
}

/// Checks the GitHub releases API for a newer version than
/// `current_version`, caching the raw response in the KV cache for
/// `cache_ttl_seconds` (spec §4.11). Network/parse failures never raise —
/// they come back as a result carrying an explanatory `message` and
/// `update_available: false`.
pub async fn check_for_app_update(
    http: &HttpFetcher,
    current_version: &str,
    force_refresh: bool,
    cache_ttl_seconds: i64,
    is_store_packaged: bool,
    windows_arch: Option<WindowsArch>,
) -> AppUpdateCheckResult {
    if is_store_packaged {
        return AppUpdateCheckResult {
            current_version: current_version.to_owned(),
            latest_version: None,
            update_available: false,
            release_url: None,
            installer_name: None,
            installer_url: None,
            message: "Ta wersja programu jest aktualizowana przez Microsoft Store.".into(),
        };
    }

    let raw = match http
        .get_text(
            GITHUB_LATEST_RELEASE_URL,
            Some(CACHE_KEY_LATEST_RELEASE),
            Some(cache_ttl_seconds),
            force_refresh,
            10.0,
        )
        .await
    {
        Ok(raw) => raw,
        Err(err) => {
            return AppUpdateCheckResult {
                current_version: current_version.to_owned(),
                latest_version: None,
                update_available: false,
                release_url: None,
                installer_name: None,
                installer_url: None,
                message: format!("Nie udało się sprawdzić aktualizacji: {err}"),
            };
        }
    };

    let data: Value = match serde_json::from_str(&raw) {
        Ok(data) => data,
        Err(err) => {
            return AppUpdateCheckResult {
                current_version: current_version.to_owned(),
                latest_version: None,
                update_available: false,
                release_url: None,
                installer_name: None,
                installer_url: None,
                message: format!("Nie udało się sprawdzić aktualizacji: {err}"),
            };
        }
    };

    let tag = data.get("tag_name").and_then(Value::as_str).unwrap_or("");
    let latest_version = if tag.is_empty() { None } else { Some(tag.trim_start_matches(['v', 'V']).to_owned()) };
    let release_url = data.get("html_url").and_then(Value::as_str).map(str::to_owned);

    let Some(latest_version) = latest_version else {
        return AppUpdateCheckResult {
            current_version: current_version.to_owned(),
            latest_version: None,
            update_available: false,
            release_url,
            installer_name: None,
            installer_url: None,
            message: "Nie udało się odczytać wersji z GitHuba.".into(),
        };
    };

    let update_available = version_tuple(&latest_version) > version_tuple(current_version);

    let assets: Vec<Value> = data.get("assets").and_then(Value::as_array).cloned().unwrap_or_default();
    let (installer_name, installer_url) = match windows_arch {
        Some(arch) => pick_windows_installer_asset(&assets, arch),
        None => (None, None),
    };

    let message = if update_available {
        format!("Dostępna jest nowa wersja: {latest_version} (masz: {current_version}).")
    } else {
        format!("Masz aktualną wersję ({current_version}).")
    };

    AppUpdateCheckResult {
        current_version: current_version.to_owned(),
        latest_version: Some(latest_version),
        update_available,
        release_url,
        installer_name,
        installer_url,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tuple_parses_and_pads() {
        assert_eq!(version_tuple("v1.2"), (1, 2, 0, 0));
        assert_eq!(version_tuple("1.2.3-rc1"), (1, 2, 3, 0));
        assert_eq!(version_tuple(""), (0, 0, 0, 0));
    }

    #[test]
    fn version_tuple_orders_correctly() {
        assert!(version_tuple("1.10.0") > version_tuple("1.9.0"));
    }

    #[test]
    fn windows_arch_detects_known_machines() {
        assert_eq!(WindowsArch::detect("AMD64"), WindowsArch::X64);
        assert_eq!(WindowsArch::detect("aarch64"), WindowsArch::Arm64);
        assert_eq!(WindowsArch::detect("riscv64"), WindowsArch::Unknown);
    }

    fn asset(name: &str) -> Value {
        serde_json::json!({ "name": name, "browser_download_url": format!("https://dl.example/{name}") })
    }

    #[test]
    fn installer_asset_selection_prefers_arch_specific_msi_then_falls_back() {
        let assets = vec![asset("programista.exe"), asset("programista-win-arm64.msi"), asset("programista-win-x64.msi")];

        let (name, _url) = pick_windows_installer_asset(&assets, WindowsArch::Arm64);
        assert_eq!(name.as_deref(), Some("programista-win-arm64.msi"));

        let (name, _url) = pick_windows_installer_asset(&assets, WindowsArch::X64);
        assert_eq!(name.as_deref(), Some("programista-win-x64.msi"));

        // arm64 with no arm64 asset present falls back to the x64 msi.
        let x64_only = vec![asset("programista.exe"), asset("programista-win-x64.msi")];
        let (name, _url) = pick_windows_installer_asset(&x64_only, WindowsArch::Arm64);
        assert_eq!(name.as_deref(), Some("programista-win-x64.msi"));
    }

    #[test]
    fn installer_asset_selection_returns_none_when_nothing_matches() {
        let assets = vec![asset("some-other-file.zip")];
        let (name, url) = pick_windows_installer_asset(&assets, WindowsArch::X64);
        assert_eq!(name, None);
        assert_eq!(url, None);
    }
}
