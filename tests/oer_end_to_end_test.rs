use commons_etl::app::pipelines::OerPipeline;
use commons_etl::config::OerConfig;
use commons_etl::{EtlEngine, HttpSession, LocalStorage, RetryPolicy};
use httpmock::prelude::*;
use tempfile::TempDir;

fn results_page(ids: std::ops::Range<usize>) -> String {
    let mut body = String::from(r#"<?xml version="1.0" encoding="utf-8"?><results>"#);
    for id in ids {
        body.push_str(&format!(
            r#"<result id="{id}"><title>Lesson {id}&nbsp;</title><modification_date>2022-05-{day:02}</modification_date><oersummary><item title="Education Level" value="High School"/><item title="Languages" value="English"/></oersummary></result>"#,
            id = id,
            day = id % 28 + 1
        ));
    }
    body.push_str("</results>");
    body
}

fn read_rows(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec![
            "id",
            "license",
            "modification_date",
            "Education Level",
            "Subject Area",
            "Material Type",
            "Media Format",
            "Languages",
            "Primary User",
            "Educational Use"
        ]
    );
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn oer_pipeline(server: &MockServer, output_path: &str) -> OerPipeline<LocalStorage> {
    let config = OerConfig {
        endpoint: server.url("/api/search"),
        licenses: vec!["cc-by".to_string()],
        refresh_counts: true,
        ..OerConfig::default()
    };
    let session = HttpSession::new(RetryPolicy::none()).unwrap();
    OerPipeline::new(
        LocalStorage::new(output_path),
        session,
        config,
        "test-token".to_string(),
    )
}

#[tokio::test]
async fn test_two_pages_produce_62_rows() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    // Setup mock OER search API
    let server = MockServer::start();
    let count_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("f.license", "cc-by")
            .query_param("batch_size", "0")
            .query_param("token", "test-token");
        then.status(200)
            .body(r#"<results total-items="62" batch-size="0"></results>"#);
    });
    let first_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_size", "50")
            .query_param("batch_start", "0");
        then.status(200).body(results_page(0..50));
    });
    let second_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_size", "50")
            .query_param("batch_start", "50");
        then.status(200).body(results_page(50..62));
    });

    let engine = EtlEngine::new(oer_pipeline(&server, &output_path));
    let output = engine.run().await.unwrap();

    count_mock.assert();
    first_page.assert();
    second_page.assert();

    let output_file = temp_dir.path().join("oer.csv");
    assert_eq!(output, output_file.display().to_string());

    let rows = read_rows(&output_file);
    assert_eq!(rows.len(), 62);
    assert!(rows.iter().all(|row| row[1] == "cc-by"));
    assert_eq!(rows[0][0], "0");
    assert_eq!(rows[61][0], "61");
    assert_eq!(rows[0][3], "High School");
    assert_eq!(rows[0][4], "");
    assert_eq!(rows[0][7], "English");

    // 計數快取也應寫入
    let cache = std::fs::read_to_string(temp_dir.path().join("license_counts.csv")).unwrap();
    assert_eq!(cache, "cc-by\n62\n");
}

#[tokio::test]
async fn test_failed_batch_and_bad_records_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let count_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_size", "0");
        then.status(200).body(r#"<results total-items="120"/>"#);
    });
    let first_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_start", "0");
        then.status(200).body(
            r#"<results><result id="1"/><result><modification_date>2020-01-01</modification_date></result><result id="3"/></results>"#,
        );
    });
    let broken_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_start", "50");
        then.status(500);
    });
    let last_page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_start", "100");
        then.status(200).body(r#"<results><result id="101"/></results>"#);
    });

    let engine = EtlEngine::new(oer_pipeline(&server, &output_path));
    engine.run().await.unwrap();

    count_mock.assert();
    first_page.assert();
    broken_page.assert();
    last_page.assert();

    let rows = read_rows(&temp_dir.path().join("oer.csv"));
    let ids: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "101"]);
}

#[tokio::test]
async fn test_cached_counts_skip_count_requests() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    std::fs::write(temp_dir.path().join("license_counts.csv"), "cc-by\n3\n").unwrap();

    let server = MockServer::start();
    let count_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_size", "0");
        then.status(200).body(r#"<results total-items="999"/>"#);
    });
    let page = server.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_start", "0");
        then.status(200)
            .body(r#"<results><result id="a"/><result id="b"/><result id="c"/></results>"#);
    });

    EtlEngine::new(cached_oer_pipeline(&server, &output_path))
        .run()
        .await
        .unwrap();

    count_mock.assert_hits(0);
    page.assert();
    assert_eq!(read_rows(&temp_dir.path().join("oer.csv")).len(), 3);
}

fn cached_oer_pipeline(server: &MockServer, output_path: &str) -> OerPipeline<LocalStorage> {
    let config = OerConfig {
        endpoint: server.url("/api/search"),
        licenses: vec!["cc-by".to_string()],
        ..OerConfig::default()
    };
    OerPipeline::new(
        LocalStorage::new(output_path),
        HttpSession::new(RetryPolicy::none()).unwrap(),
        config,
        "test-token".to_string(),
    )
}

#[tokio::test]
async fn test_license_recovers_after_failed_count() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    // 第一次執行：計數 API 失敗
    let failing = MockServer::start();
    let failing_mock = failing.mock(|when, then| {
        when.method(GET).path("/api/search");
        then.status(500);
    });
    EtlEngine::new(cached_oer_pipeline(&failing, &output_path))
        .run()
        .await
        .unwrap();
    failing_mock.assert();
    assert!(read_rows(&temp_dir.path().join("oer.csv")).is_empty());
    assert!(!temp_dir.path().join("license_counts.csv").exists());

    // 第二次執行：API 恢復，應重新計數並抓取資料
    let healthy = MockServer::start();
    let count_mock = healthy.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_size", "0");
        then.status(200).body(r#"<results total-items="12"/>"#);
    });
    let page = healthy.mock(|when, then| {
        when.method(GET)
            .path("/api/search")
            .query_param("batch_start", "0");
        then.status(200).body(results_page(0..12));
    });
    EtlEngine::new(cached_oer_pipeline(&healthy, &output_path))
        .run()
        .await
        .unwrap();

    count_mock.assert();
    page.assert();
    assert_eq!(read_rows(&temp_dir.path().join("oer.csv")).len(), 12);
    let cache = std::fs::read_to_string(temp_dir.path().join("license_counts.csv")).unwrap();
    assert_eq!(cache, "cc-by\n12\n");
}
