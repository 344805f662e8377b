//! Integration tests for the particle catalog repository.

use debroglie_db::models::particle::{CreateParticle, UpdateParticle};
use debroglie_db::repositories::ParticleRepo;
use sqlx::PgPool;

fn new_particle(name: &str, mass: f64) -> CreateParticle {
    CreateParticle {
        name: name.to_string(),
        mass,
        image: None,
        description: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_name_filter_is_case_insensitive(pool: PgPool) {
    let found = ParticleRepo::list(&pool, Some("ELECTR")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "electron");

    let all = ParticleRepo::list(&pool, None).await.unwrap();
    assert!(all.len() >= 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_hides_particle(pool: PgPool) {
    let tau = ParticleRepo::create(&pool, &new_particle("tau", 3.16754e-27))
        .await
        .unwrap();

    assert!(ParticleRepo::soft_delete(&pool, tau.id).await.unwrap());
    assert!(ParticleRepo::find_by_id(&pool, tau.id).await.unwrap().is_none());
    assert!(!ParticleRepo::soft_delete(&pool, tau.id).await.unwrap());

    // The name is free again once the old row is deleted.
    ParticleRepo::create(&pool, &new_particle("tau", 3.16754e-27))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_applies_only_given_fields(pool: PgPool) {
    let pion = ParticleRepo::create(&pool, &new_particle("pion", 2.488e-28))
        .await
        .unwrap();

    let updated = ParticleRepo::update(
        &pool,
        pion.id,
        &UpdateParticle {
            description: Some("Lightest meson".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.name, "pion");
    assert_eq!(updated.mass, 2.488e-28);
    assert_eq!(updated.description.as_deref(), Some("Lightest meson"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_live_name_is_rejected(pool: PgPool) {
    let err = ParticleRepo::create(&pool, &new_particle("electron", 9.1e-31))
        .await
        .unwrap_err();
    match err {
        sqlx::Error::Database(db) => assert_eq!(db.constraint(), Some("uq_particles_name")),
        other => panic!("expected unique violation, got {other:?}"),
    }
}
