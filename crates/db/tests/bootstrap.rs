use sqlx::PgPool;

/// Connect, migrate, verify schema and seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    debroglie_db::health_check(&pool).await.unwrap();

    let statuses: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM calculation_request_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    let names: Vec<&str> = statuses.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(
        names,
        vec!["draft", "formed", "completed", "rejected", "deleted"]
    );

    // Lookup ids must match the domain enum.
    for (id, name) in &statuses {
        let status = debroglie_core::calculation_status::RequestStatus::from_id(*id).unwrap();
        assert_eq!(status.as_str(), name);
    }

    let particles: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM particles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(particles.0 >= 5, "particle catalog should be seeded");
}

/// The system reviewer exists, holds the service role and cannot log in.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_system_reviewer_seeded(pool: PgPool) {
    let user = debroglie_db::repositories::UserRepo::find_by_id(&pool, 1)
        .await
        .unwrap()
        .expect("system reviewer should exist");
    assert_eq!(user.username, "calculation-service");
    assert!(!user.is_active);

    let role = debroglie_db::repositories::RoleRepo::resolve_name(&pool, user.role_id)
        .await
        .unwrap();
    assert_eq!(role, debroglie_core::roles::ROLE_SERVICE);
}
