use checkout_etl::{run, CheckoutError, Endpoints, HttpPlatform, LocalStorage, RunConfig};
use httpmock::prelude::*;
use httpmock::Mock;
use tempfile::TempDir;

const INPUT: &str = "vat_code,creditor_iban,amount,expire_date,remittance\n\
IT123,IT60X0542811101000000123456,10.50,2030-01-31,inv1\n\
IT456,IT60X0542811101000000123456,20,2030-02-28,inv2\n";

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        oauth: server.url("/oauth"),
        openid: server.url("/openid"),
        platform: server.url("/api"),
        checkout: "https://checkout.example".to_string(),
    }
}

fn config(server: &MockServer, input: &str) -> RunConfig {
    RunConfig {
        client_id: Some("client".to_string()),
        client_secret: Some("secret".to_string()),
        input_path: Some(input.to_string()),
        endpoints: endpoints(server),
        ..RunConfig::default()
    }
}

struct SessionMocks<'a> {
    token: Mock<'a>,
    introspection: Mock<'a>,
    business: Mock<'a>,
}

fn mock_session(server: &MockServer) -> SessionMocks<'_> {
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .body_contains("grant_type=client_credentials");
        then.status(200)
            .json_body(serde_json::json!({"access_token": "tok", "token_type": "Bearer"}));
    });
    let introspection = server.mock(|when, then| {
        when.method(POST)
            .path("/openid/token/introspection")
            .body_contains("token=tok");
        then.status(200)
            .json_body(serde_json::json!({"tenant_id": "t-1"}));
    });
    let business = server.mock(|when, then| {
        when.method(GET)
            .path("/api/t-1/businesses/current")
            .header("Authorization", "Bearer tok");
        then.status(200)
            .json_body(serde_json::json!({"vatCountryID": "IT", "vatCode": "01234567890"}));
    });
    SessionMocks {
        token,
        introspection,
        business,
    }
}

fn write_input(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

fn read_output(path: &str) -> anyhow::Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok((header, rows))
}

#[tokio::test]
async fn test_map_mode_generates_one_checkout_per_row() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, "payments.csv", INPUT);
    let server = MockServer::start();
    let session = mock_session(&server);

    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/api/t-1/transfers")
            .body_contains("\"remittance\":\"inv1\"")
            .body_contains("\"creditor\":\"IT01234567890\"");
        then.status(200)
            .json_body(serde_json::json!({"fingerprint": "fp-1", "codeInvoice": "CI-1"}));
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path("/api/t-1/transfers")
            .body_contains("\"remittance\":\"inv2\"");
        then.status(200).json_body(serde_json::json!({
            "fingerprint": "fp-2",
            "codeInvoice": "CI-2",
            "url": "https://pay.example/fp-2"
        }));
    });

    let output = run(
        config(&server, &input),
        LocalStorage::default(),
        HttpPlatform::new(endpoints(&server)),
    )
    .await?;

    session.token.assert();
    session.introspection.assert();
    session.business.assert();
    first.assert();
    second.assert();

    assert_eq!(
        output,
        dir.path().join("payments_generated.csv").to_string_lossy()
    );

    let (header, rows) = read_output(&output)?;
    assert_eq!(
        header,
        vec![
            "vat_code",
            "creditor_iban",
            "amount",
            "expire_date",
            "remittance",
            "fingerprint",
            "code_invoice",
            "url_checkout"
        ]
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][4], "inv1");
    assert_eq!(rows[0][5..], ["fp-1", "CI-1", "https://checkout.example/fp-1"]);
    assert_eq!(rows[1][4], "inv2");
    assert_eq!(rows[1][5..], ["fp-2", "CI-2", "https://pay.example/fp-2"]);

    Ok(())
}

#[tokio::test]
async fn test_mapping_file_and_label_override() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(
        &dir,
        "fatture.csv",
        "Cliente;IBAN;Importo;Scadenza;Causale;Note\n\
IT123;IT60X0542811101000000123456;10,50;31/01/2030;inv1;first\n",
    );
    let mapping = write_input(
        &dir,
        "map.json",
        r#"{"vat_code": "Cliente", "creditor_iban": "IBAN", "amount": "Importo",
            "expire_date": "Scadenza", "remittance": "Causale", "code_invoice": "Codice"}"#,
    );
    let server = MockServer::start();
    let _session = mock_session(&server);
    let transfer = server.mock(|when, then| {
        when.method(POST)
            .path("/api/t-1/transfers")
            .body_contains("\"amount\":10.5")
            .body_contains("\"date\":\"2030-01-31\"")
            .body_contains("\"debtor\":\"IT123\"");
        then.status(200)
            .json_body(serde_json::json!({"fingerprint": "fp-1", "codeInvoice": "CI-1"}));
    });

    let mut config = config(&server, &input);
    config.mapping_path = Some(mapping);
    config.output_path = Some(dir.path().join("out.csv").to_string_lossy().to_string());
    config
        .label_overrides
        .insert(checkout_etl::domain::field::CanonicalField::Fingerprint, "Impronta".to_string());

    let output = run(config, LocalStorage::default(), HttpPlatform::new(endpoints(&server))).await?;
    transfer.assert();

    let content = std::fs::read_to_string(&output)?;
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("Cliente;IBAN;Importo;Scadenza;Causale;Note;Impronta;Codice;url_checkout")
    );
    assert_eq!(
        lines.next(),
        Some("IT123;IT60X0542811101000000123456;10,50;31/01/2030;inv1;first;fp-1;CI-1;https://checkout.example/fp-1")
    );

    Ok(())
}

#[tokio::test]
async fn test_malformed_mapping_file_fails_before_authentication() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, "payments.csv", INPUT);
    let mapping = write_input(&dir, "map.json", "{ not json");
    let server = MockServer::start();
    let session = mock_session(&server);

    let mut config = config(&server, &input);
    config.mapping_path = Some(mapping);

    let err = run(config, LocalStorage::default(), HttpPlatform::new(endpoints(&server)))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::MappingFileError { .. }));
    session.token.assert_hits(0);
    assert!(!dir.path().join("payments_generated.csv").exists());

    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_fail_before_authentication() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, "payments.csv", INPUT);
    let server = MockServer::start();
    let session = mock_session(&server);

    let mut config = config(&server, &input);
    config.client_secret = None;

    let err = run(config, LocalStorage::default(), HttpPlatform::new(endpoints(&server)))
        .await
        .unwrap_err();

    match err {
        CheckoutError::MissingConfigError { field } => assert_eq!(field, "client_secret"),
        other => panic!("unexpected error: {other:?}"),
    }
    session.token.assert_hits(0);

    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, "payments.csv", INPUT);
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(401).body("invalid_client");
    });

    let err = run(
        config(&server, &input),
        LocalStorage::default(),
        HttpPlatform::new(endpoints(&server)),
    )
    .await
    .unwrap_err();

    token.assert();
    assert!(matches!(err, CheckoutError::AuthenticationError { .. }));
    assert!(!dir.path().join("payments_generated.csv").exists());

    Ok(())
}

#[tokio::test]
async fn test_checkout_failure_aborts_without_output() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, "payments.csv", INPUT);
    let server = MockServer::start();
    let _session = mock_session(&server);
    let _first = server.mock(|when, then| {
        when.method(POST)
            .path("/api/t-1/transfers")
            .body_contains("\"remittance\":\"inv1\"");
        then.status(200)
            .json_body(serde_json::json!({"fingerprint": "fp-1", "codeInvoice": "CI-1"}));
    });
    let _second = server.mock(|when, then| {
        when.method(POST)
            .path("/api/t-1/transfers")
            .body_contains("\"remittance\":\"inv2\"");
        then.status(500).body("boom");
    });

    let err = run(
        config(&server, &input),
        LocalStorage::default(),
        HttpPlatform::new(endpoints(&server)),
    )
    .await
    .unwrap_err();

    match err {
        CheckoutError::RemoteCallError { operation, row, .. } => {
            assert_eq!(operation, "create_checkout");
            assert_eq!(row, Some(1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("payments_generated.csv").exists());

    Ok(())
}

#[tokio::test]
async fn test_script_mode_with_iban_override() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(
        &dir,
        "orders.csv",
        "Customer,Total,Ref\nIT123,10.50,inv1\nIT456,20,inv2\n",
    );
    let script = write_input(
        &dir,
        "transform.lua",
        r#"
return function(row)
  return {
    vat_code = row["Customer"],
    creditor_iban = "IT00SCRIPT",
    amount = row["Total"],
    expire_date = "2030-01-31",
    remittance = "Order " .. row["Ref"],
  }
end
"#,
    );
    let server = MockServer::start();
    let _session = mock_session(&server);
    let transfers = server.mock(|when, then| {
        when.method(POST)
            .path("/api/t-1/transfers")
            .body_contains("\"creditorIban\":\"IT02L1234512345123456789012\"");
        then.status(200)
            .json_body(serde_json::json!({"fingerprint": "fp", "codeInvoice": "CI"}));
    });

    let mut config = config(&server, &input);
    config.script_path = Some(script);
    config.creditor_iban = Some("IT02L1234512345123456789012".to_string());

    let output = run(config, LocalStorage::default(), HttpPlatform::new(endpoints(&server))).await?;
    transfers.assert_hits(2);

    let (header, rows) = read_output(&output)?;
    assert_eq!(
        header,
        vec!["Customer", "Total", "Ref", "fingerprint", "code_invoice", "url_checkout"]
    );
    assert_eq!(rows[0], ["IT123", "10.50", "inv1", "fp", "CI", "https://checkout.example/fp"]);
    assert_eq!(rows[1][..3], ["IT456", "20", "inv2"]);

    Ok(())
}

#[tokio::test]
async fn test_script_contract_violation_makes_no_checkout() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, "orders.csv", "Customer,Total\nIT123,10\n");
    let script = write_input(
        &dir,
        "broken.lua",
        "function transform(row) return { vat_code = row.Customer } end",
    );
    let server = MockServer::start();
    let _session = mock_session(&server);
    let transfers = server.mock(|when, then| {
        when.method(POST).path("/api/t-1/transfers");
        then.status(200)
            .json_body(serde_json::json!({"fingerprint": "fp", "codeInvoice": "CI"}));
    });

    let mut config = config(&server, &input);
    config.script_path = Some(script);

    let err = run(config, LocalStorage::default(), HttpPlatform::new(endpoints(&server)))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::ScriptContractError { row: 0, .. }));
    transfers.assert_hits(0);

    Ok(())
}
