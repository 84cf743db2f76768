use sqlx::{PgPool, Row};

use crate::registry::{ProfileSnapshot, DEFAULT_SUBJECTS};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_subject(pool: &PgPool, name: &str) -> anyhow::Result<i32> {
    let id: i32 = sqlx::query(
        r#"
        INSERT INTO transcript_early_warning.subjects (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn link_profile(pool: &PgPool, class_name: &str, subject_id: i32) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO transcript_early_warning.class_profiles (class_name, subject_id)
        VALUES ($1, $2)
        ON CONFLICT (class_name, subject_id) DO NOTHING
        "#,
    )
    .bind(class_name)
    .bind(subject_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    for name in DEFAULT_SUBJECTS.iter().chain(["Химия", "Биология", "История"].iter()) {
        upsert_subject(pool, name).await?;
    }

    let profiles = vec![
        ("10А", vec!["Алгебра", "Геометрия", "Физика", "Информатика"]),
        ("10Б", vec!["Химия", "Биология"]),
        ("11А", vec!["Алгебра", "Геометрия", "Вероятность и статистика"]),
    ];

    for (class_name, subjects) in profiles {
        for subject in subjects {
            let subject_id = upsert_subject(pool, subject).await?;
            link_profile(pool, class_name, subject_id).await?;
        }
    }

    Ok(())
}

pub async fn fetch_profile_snapshot(pool: &PgPool) -> anyhow::Result<ProfileSnapshot> {
    let rows = sqlx::query(
        r#"
        SELECT cp.class_name, s.name AS subject
        FROM transcript_early_warning.class_profiles cp
        JOIN transcript_early_warning.subjects s ON s.id = cp.subject_id
        ORDER BY cp.class_name, s.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut snapshot = ProfileSnapshot::new();
    for row in rows {
        let class_name: String = row.get("class_name");
        let subject: String = row.get("subject");
        snapshot.insert(&class_name, &subject);
    }

    Ok(snapshot)
}

/// Import `class_name,subject` rows. Returns how many new profile links were added.
pub async fn import_profiles_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        class_name: String,
        subject: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let class_name = row.class_name.trim();
        let subject = row.subject.trim();
        if class_name.is_empty() || subject.is_empty() {
            continue;
        }

        let subject_id = upsert_subject(pool, subject).await?;
        if link_profile(pool, class_name, subject_id).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
