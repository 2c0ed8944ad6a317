use groundwork_core::testing::TestDatabase;

/// Connect to the configured test server, or skip the calling test when
/// TEST_DATABASE_URL is unset.
pub async fn test_database() -> Option<TestDatabase> {
    let _ = tracing_subscriber::fmt().try_init();

    if std::env::var("TEST_DATABASE_URL").is_err() {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    }

    Some(
        TestDatabase::from_env()
            .await
            .expect("failed to connect to TEST_DATABASE_URL"),
    )
}
