use finsight::AppCommand;
use finsight::core::error::InsightsError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEDGER: &str = include_str!("../docs/example_ledger.yaml");

mod test_utils {
    use super::*;

    pub async fn create_metal_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;
        for (metal, eur, usd) in [
            ("XAU", "2750.12", "2845.5"),
            ("XAG", "30.41", "31.47"),
            ("XPT", "935.8", "968.3"),
        ] {
            let body = format!(
                r#"{{"success": true, "base": "{metal}", "timestamp": 1738627200, "rates": {{"EUR": {eur}, "USD": {usd}}}}}"#
            );
            Mock::given(method("GET"))
                .and(path("/latest"))
                .and(query_param("base", metal))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&mock_server)
                .await;
        }
        mock_server
    }

    pub async fn create_stock_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/quotes/\d{4}-\d{2}-\d{2}$"))
            .and(query_param("identifier", "US0378331005"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"currency": "EUR", "exchange": "XNAS", "price": 150, "isin": "US0378331005"}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/assets/dividends"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"dividendDetails": {}}"#),
            )
            .mount(&mock_server)
            .await;
        mock_server
    }

    /// Writes a config plus ledger into `dir` and returns the config path.
    pub fn write_config(dir: &Path, owner: Option<&str>, metal_url: &str, stock_url: &str) -> String {
        fs::write(dir.join("ledger.yaml"), LEDGER).unwrap();
        let owner_line = owner.map(|o| format!("owner: {o}\n")).unwrap_or_default();
        let config = format!(
            r#"{owner_line}currency: EUR
ledger_path: ledger.yaml
data_path: "{data}"
providers:
  metal_price:
    base_url: "{metal_url}"
    api_key: "test"
  stock:
    base_url: "{stock_url}"
cache:
  persist: false
  provider_timeout_ms: 2000
"#,
            data = dir.join("data").display()
        );
        let config_path = dir.join("config.yaml");
        fs::write(&config_path, config).unwrap();
        config_path.to_string_lossy().into_owned()
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mocked_providers() {
    let temp_dir = TempDir::new().unwrap();
    let metals = test_utils::create_metal_mock_server().await;
    let stocks = test_utils::create_stock_mock_server().await;
    let config_path = test_utils::write_config(
        temp_dir.path(),
        Some("alice"),
        &metals.uri(),
        &stocks.uri(),
    );

    for command in [
        AppCommand::Balance { months: 1 },
        AppCommand::Categories {
            months: 3,
            totals: false,
        },
        AppCommand::Categories {
            months: 6,
            totals: true,
        },
        AppCommand::Budgets,
        AppCommand::Portfolio,
        AppCommand::Metals { code: None },
        AppCommand::Metals {
            code: Some("xau".to_string()),
        },
    ] {
        info!(?command, "Running command");
        let result = finsight::run_command(command.clone(), Some(&config_path), None).await;
        assert!(result.is_ok(), "{command:?} failed: {:?}", result.err());
    }
}

#[test_log::test(tokio::test)]
async fn test_unknown_metal_code_fails() {
    let temp_dir = TempDir::new().unwrap();
    let metals = test_utils::create_metal_mock_server().await;
    let config_path =
        test_utils::write_config(temp_dir.path(), Some("alice"), &metals.uri(), &metals.uri());

    let result = finsight::run_command(
        AppCommand::Metals {
            code: Some("XPD".to_string()),
        },
        Some(&config_path),
        None,
    )
    .await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("XPD"));
}

#[test_log::test(tokio::test)]
async fn test_missing_ledger_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = test_utils::write_config(
        temp_dir.path(),
        Some("alice"),
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
    );
    fs::remove_file(temp_dir.path().join("ledger.yaml")).unwrap();

    let err = finsight::run_command(AppCommand::Budgets, Some(&config_path), None)
        .await
        .unwrap_err();

    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<InsightsError>(),
        Some(InsightsError::StoreUnavailable(_))
    )));
}

#[test_log::test(tokio::test)]
async fn test_blank_owner_is_unauthenticated() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = test_utils::write_config(
        temp_dir.path(),
        None,
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
    );

    let err = finsight::run_command(
        AppCommand::Balance { months: 1 },
        Some(&config_path),
        Some("   "),
    )
    .await
    .unwrap_err();

    assert!(err.chain().any(|cause| matches!(
        cause.downcast_ref::<InsightsError>(),
        Some(InsightsError::Unauthenticated)
    )));
}

#[test_log::test(tokio::test)]
async fn test_owner_flag_selects_ledger_records() {
    let temp_dir = TempDir::new().unwrap();
    let stocks = test_utils::create_stock_mock_server().await;
    let config_path =
        test_utils::write_config(temp_dir.path(), None, &stocks.uri(), &stocks.uri());

    let result =
        finsight::run_command(AppCommand::Portfolio, Some(&config_path), Some("alice")).await;
    assert!(result.is_ok(), "{:?}", result.err());
}
