use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use obras::db::{EntryFilter, LedgerStore, MemoryStore};
use obras::error::ObrasError;
use obras::import::{parse_statement, read_statement, ImportSession, ImportStep};
use obras::models::{Category, Item, NewProject, Project, ProjectForm};

const STATEMENT: &str = "Data;Detalhes;Valor\n\
    02/05/2024;PIX PEDREIRO JOAO;-1.500,00\n\
    03/05/2024;PIX ELETRICISTA;-800,00\n\
    04/05/2024;BOLETO DEPOSITO SAO JORGE;-100,00\n";

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("info,obras=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn subcategories() -> Vec<String> {
    vec!["General".to_string(), "Electrical".to_string()]
}

async fn seed_project(store: &MemoryStore, name: &str) -> Project {
    store
        .insert_project(&NewProject {
            name: name.to_string(),
            address: "Rua das Flores, 10".to_string(),
            client_name: "Maria".to_string(),
            client_tax_id: "12345678901".to_string(),
            budget: dec("100000"),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        })
        .await
        .unwrap()
}

fn onboarding_form(session: &ImportSession) -> ProjectForm {
    let mut form = session
        .onboarding_form(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap())
        .expect("form for the current unknown project");
    form.address = "Av. Oceânica, 500".to_string();
    form.client_name = "Pedro".to_string();
    form.client_tax_id = "98765432100".to_string();
    form.budget = "250000".to_string();
    form.end_date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
    form
}

/// Rows for a known project, an unknown project and a material purchase.
async fn classified_session(store: &MemoryStore) -> ImportSession {
    let projects = vec![seed_project(store, "ALPHA").await];
    let rows = parse_statement(STATEMENT.as_bytes()).unwrap();
    assert_eq!(rows.len(), 3);

    let mut session = ImportSession::new(rows, &projects, subcategories());
    let grid = session.grid_mut();
    grid.set_project(0, "alpha");
    grid.set_category(0, Some(Category::Labor));
    grid.set_description(0, "Alvenaria");
    grid.set_project(1, "Beta");
    grid.set_category(1, Some(Category::Labor));
    grid.set_description(1, "Instalação elétrica");
    grid.set_project(2, "ALPHA");
    grid.set_category(2, Some(Category::Material));
    grid.set_description(2, "Materiais");
    session
}

#[tokio::test]
async fn unknown_project_defers_the_whole_batch() {
    init_tracing();
    let store = MemoryStore::new();
    let mut session = classified_session(&store).await;

    session.submit(&store).await.unwrap();

    assert_eq!(session.step(), ImportStep::ConfirmOnboarding);
    let pending: Vec<&str> = session.onboarding().unwrap().pending().collect();
    assert_eq!(pending, vec!["BETA"]);
    assert_eq!(store.entry_count().await, 0);
}

#[tokio::test]
async fn full_import_with_onboarding_and_detailing() {
    init_tracing();
    let store = MemoryStore::new();
    let mut session = classified_session(&store).await;

    session.submit(&store).await.unwrap();
    session.proceed_onboarding().unwrap();
    assert_eq!(session.step(), ImportStep::Onboarding);

    let form = onboarding_form(&session);
    let beta = session.submit_project(&form, &store).await.unwrap();
    assert_eq!(beta.name, "BETA");

    // the retried submission writes the two labor rows and holds the material one
    assert_eq!(session.step(), ImportStep::SelectMaterial);
    assert_eq!(store.entry_count().await, 2);

    let flow = session.detailing_mut().unwrap();
    assert_eq!(flow.selection().len(), 1);
    flow.toggle(0);
    session.confirm_selection(&store).await.unwrap();
    assert_eq!(session.step(), ImportStep::DetailMaterial);

    let short = vec![Item {
        name: "Cimento".to_string(),
        subcategory: "General".to_string(),
        quantity: dec("2"),
        value: dec("99.99"),
    }];
    let err = session.submit_items(short, &store).await.unwrap_err();
    assert!(matches!(err, ObrasError::AmountMismatch { .. }));
    assert_eq!(session.step(), ImportStep::DetailMaterial);

    let items = vec![
        Item {
            name: "Cimento".to_string(),
            subcategory: "General".to_string(),
            quantity: dec("2"),
            value: dec("40.00"),
        },
        Item {
            name: "Fio 2,5mm".to_string(),
            subcategory: "Electrical".to_string(),
            quantity: dec("1"),
            value: dec("60.00"),
        },
    ];
    session.submit_items(items, &store).await.unwrap();

    assert_eq!(session.step(), ImportStep::Finished);
    assert_eq!(session.total_inserted(), 3);

    let beta_entries = store.list_entries(&EntryFilter::project(beta.id)).await.unwrap();
    assert_eq!(beta_entries.len(), 1);
    assert_eq!(beta_entries[0].amount, dec("800"));

    let materials = store
        .list_entries(&EntryFilter::category(Category::Material))
        .await
        .unwrap();
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0].items.as_ref().map(Vec::len), Some(2));
    assert_eq!(materials[0].detail.as_deref(), Some("BOLETO DEPOSITO SAO JORGE"));
}

#[tokio::test]
async fn reimporting_the_same_statement_adds_nothing() {
    init_tracing();
    let store = MemoryStore::new();
    let alpha = seed_project(&store, "ALPHA").await;

    for round in 0..2 {
        let rows = parse_statement(STATEMENT.as_bytes()).unwrap();
        let mut session = ImportSession::new(rows, std::slice::from_ref(&alpha), subcategories());
        for i in 0..2 {
            session.grid_mut().set_project(i, "ALPHA");
            session.grid_mut().set_category(i, Some(Category::Other));
            session.grid_mut().set_description(i, "Serviços");
        }

        session.submit(&store).await.unwrap();
        assert_eq!(session.step(), ImportStep::Finished);

        let report = session.last_report().unwrap();
        assert_eq!(report.submitted, 2);
        assert_eq!(report.inserted, if round == 0 { 2 } else { 0 });
    }

    assert_eq!(store.entry_count().await, 2);
}

#[tokio::test]
async fn invalid_onboarding_form_keeps_the_batch_pending() {
    init_tracing();
    let store = MemoryStore::new();
    let mut session = classified_session(&store).await;
    session.submit(&store).await.unwrap();
    session.proceed_onboarding().unwrap();

    let mut form = onboarding_form(&session);
    form.client_tax_id = "12345".to_string();
    let err = session.submit_project(&form, &store).await.unwrap_err();
    assert!(matches!(err, ObrasError::Validation(_)));
    assert_eq!(session.step(), ImportStep::Onboarding);

    session.cancel();
    assert_eq!(session.step(), ImportStep::Cancelled);
    assert_eq!(store.entry_count().await, 0);
    assert_eq!(store.list_projects().await.unwrap().len(), 1);
}

#[tokio::test]
async fn zero_amount_rows_are_rejected_before_writing() {
    init_tracing();
    let store = MemoryStore::new();
    let alpha = seed_project(&store, "ALPHA").await;

    let statement = "Data;Detalhes;Valor\n\
        05/01/2024;TARIFA;0,00\n\
        06/01/2024;PIX PEDREIRO;-300,00\n";
    let rows = parse_statement(statement.as_bytes()).unwrap();
    let mut session = ImportSession::new(rows, std::slice::from_ref(&alpha), subcategories());
    for i in 0..2 {
        session.grid_mut().set_project(i, "alpha");
        session.grid_mut().set_category(i, Some(Category::Other));
        session.grid_mut().set_description(i, "tarifa");
    }

    let err = session.submit(&store).await.unwrap_err();
    match err {
        ObrasError::Validation(msg) => assert!(msg.contains("TARIFA")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(session.step(), ImportStep::Classify);
    assert_eq!(store.entry_count().await, 0);

    // leaving the row unclassified lets the rest through
    session.grid_mut().set_project(0, "");
    session.submit(&store).await.unwrap();
    assert_eq!(session.step(), ImportStep::Finished);

    let saved = store.list_entries(&EntryFilter::default()).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].amount, dec("300"));
}

#[tokio::test]
async fn workbook_statement_imports_like_csv() {
    init_tracing();
    let store = MemoryStore::new();
    let alpha = seed_project(&store, "ALPHA").await;

    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/statement.xlsx");
    let rows = read_statement(&path).unwrap();
    assert_eq!(rows.len(), 3);

    let mut session = ImportSession::new(rows, std::slice::from_ref(&alpha), subcategories());
    for i in 0..3 {
        session.grid_mut().set_project(i, "ALPHA");
        session.grid_mut().set_description(i, "extrato");
    }
    session.grid_mut().set_category(0, Some(Category::Labor));
    session.grid_mut().set_category(2, Some(Category::Other));

    session.submit(&store).await.unwrap();
    assert_eq!(session.step(), ImportStep::Finished);
    assert_eq!(session.total_inserted(), 3);

    let deposits = store
        .list_entries(&EntryFilter::category(Category::Deposit))
        .await
        .unwrap();
    assert_eq!(deposits.len(), 1);
    assert_eq!(deposits[0].amount, dec("2500.50"));
}
