use commons_etl::app::jobs;
use commons_etl::config::WikimediaConfig;
use commons_etl::{JobsConfig, RetryPolicy};
use httpmock::prelude::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_wikimedia_job_writes_year_histogram_rows() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();
    std::fs::write(
        temp_dir.path().join("license_list.csv"),
        "LICENSE TYPE\nCC-BY-4.0\nCC-Zero\nGFDL\n",
    )
    .unwrap();

    let server = MockServer::start();
    let cc_by_members = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("list", "categorymembers")
            .query_param("cmtitle", "Category:CC-BY-4.0");
        then.status(200).json_body(serde_json::json!({
            "query": {"categorymembers": [
                {"pageid": 11, "ns": 6, "title": "File:Bridge.jpg"},
                {"pageid": 12, "ns": 6, "title": "File:Tower.jpg"},
                {"pageid": 13, "ns": 6, "title": "File:Missing.jpg"}
            ]}
        }));
    });
    let cc_zero_members = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("list", "categorymembers")
            .query_param("cmtitle", "Category:CC-Zero");
        then.status(200).json_body(serde_json::json!({
            "query": {"categorymembers": [
                {"pageid": 21, "ns": 6, "title": "File:Lake.png"}
            ]}
        }));
    });

    let image_mocks = [
        ("File:Bridge.jpg", 11, "2005-02-03T04:05:06Z"),
        ("File:Tower.jpg", 12, "2005-11-30T00:00:00Z"),
        ("File:Lake.png", 21, "2023-01-01T00:00:00Z"),
    ]
    .map(|(title, pageid, timestamp): (&str, u64, &str)| {
        let mut pages = serde_json::Map::new();
        pages.insert(
            pageid.to_string(),
            serde_json::json!({"pageid": pageid, "imageinfo": [{"timestamp": timestamp}]}),
        );
        server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("prop", "imageinfo")
                .query_param("titles", title);
            then.status(200)
                .json_body(serde_json::json!({"query": {"pages": pages}}));
        })
    });
    let missing_image = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("titles", "File:Missing.jpg");
        then.status(200)
            .json_body(serde_json::json!({"query": {"pages": {"-1": {"missing": ""}}}}));
    });

    let config = JobsConfig {
        output_path: output_path.clone(),
        http: RetryPolicy::none(),
        wikimedia: WikimediaConfig {
            endpoint: server.url("/w/api.php"),
            max_licenses: Some(2),
            output_file: Some("wikicommons.csv".to_string()),
            ..WikimediaConfig::default()
        },
        ..JobsConfig::default()
    };

    let output = jobs::run_wikimedia(&config).await.unwrap();

    cc_by_members.assert();
    cc_zero_members.assert();
    for mock in &image_mocks {
        mock.assert();
    }
    missing_image.assert();

    let output_file = temp_dir.path().join("wikicommons.csv");
    assert_eq!(output, output_file.display().to_string());

    let content = std::fs::read_to_string(output_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "License Type,2004,2005,2006,2007,2008,2009,2010,2011,2012,2013,2014,\
2015,2016,2017,2018,2019,2020,2021,2022,2023"
    );
    assert_eq!(lines[1], "CC-BY-4.0,0,2,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0");
    assert_eq!(lines[2], "CC-Zero,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1");
}

#[tokio::test]
async fn test_failed_category_listing_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let broken = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("cmtitle", "Category:Broken");
        then.status(500);
    });
    let empty = server.mock(|when, then| {
        when.method(GET)
            .path("/w/api.php")
            .query_param("cmtitle", "Category:Empty");
        then.status(200)
            .json_body(serde_json::json!({"query": {"categorymembers": []}}));
    });

    let config = JobsConfig {
        output_path,
        http: RetryPolicy::none(),
        wikimedia: WikimediaConfig {
            endpoint: server.url("/w/api.php"),
            licenses: vec!["Broken".to_string(), "Empty".to_string()],
            start_year: 2020,
            end_year: 2021,
            output_file: Some("out.csv".to_string()),
            ..WikimediaConfig::default()
        },
        ..JobsConfig::default()
    };

    jobs::run_wikimedia(&config).await.unwrap();
    broken.assert();
    empty.assert();

    let content = std::fs::read_to_string(temp_dir.path().join("out.csv")).unwrap();
    assert_eq!(content, "License Type,2020,2021\nEmpty,0,0\n");
}
