// SQLite store for feature data and alignment results

use super::{AlignmentResult, EntityMode, Granularity, Store};
use crate::features::{parse_feature, ChannelValues, Entity, FeatureChannel, FeatureSequence};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

/// Alignment database.
///
/// Wraps Connection in a parking_lot::Mutex since rusqlite::Connection is not
/// Sync. Worker threads share the database through this handle; the mutex is
/// the single serialization point of a run.
pub struct AlignmentDatabase {
    conn: Mutex<Connection>,
}

impl AlignmentDatabase {
    /// Open the database and apply bulk-load settings.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)?;

        // Tuned for large append-only batches; durability is restored by the
        // final synchronous=FULL before close.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=OFF;
            PRAGMA temp_store=MEMORY;
            PRAGMA cache_size=-2000000;
        "#,
        )?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (tests).
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Create the result tables if absent. Input tables (Segment, Score,
    /// SegmentToGroup) are owned by the feature-extraction stage; they are
    /// created here too so a fresh database is usable for tests and dry runs.
    fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS Score (
                score_id INTEGER PRIMARY KEY,
                diatonic_feature TEXT NOT NULL DEFAULT '',
                chromatic_feature TEXT NOT NULL DEFAULT '',
                rhythmic_feature TEXT NOT NULL DEFAULT '',
                diatonic_rhythmic_feature TEXT NOT NULL DEFAULT '',
                chromatic_rhythmic_feature TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS Segment (
                segment_id INTEGER PRIMARY KEY,
                score_id INTEGER NOT NULL,
                start_note INTEGER NOT NULL DEFAULT 0,
                diatonic_feature TEXT NOT NULL DEFAULT '',
                chromatic_feature TEXT NOT NULL DEFAULT '',
                rhythmic_feature TEXT NOT NULL DEFAULT '',
                diatonic_rhythmic_feature TEXT NOT NULL DEFAULT '',
                chromatic_rhythmic_feature TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS SegmentToGroup (
                segment_id INTEGER NOT NULL,
                feature_type TEXT NOT NULL,
                group_id INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS SegmentAlignment (
                segment_id_1 INTEGER NOT NULL,
                segment_id_2 INTEGER NOT NULL,
                diatonic_score INTEGER NOT NULL,
                chromatic_score INTEGER NOT NULL,
                rhythmic_score INTEGER NOT NULL,
                diatonic_rhythmic_score INTEGER NOT NULL,
                chromatic_rhythmic_score INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ScoreAlignment (
                score_id_1 INTEGER NOT NULL,
                score_id_2 INTEGER NOT NULL,
                level TEXT NOT NULL,
                diatonic_score INTEGER NOT NULL,
                chromatic_score INTEGER NOT NULL,
                rhythmic_score INTEGER NOT NULL,
                diatonic_rhythmic_score INTEGER NOT NULL,
                chromatic_rhythmic_score INTEGER NOT NULL
            );
        "#,
        )?;

        Ok(())
    }

    /// Restore full synchronous mode once the batch run is done.
    pub fn finish(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA synchronous=FULL")?;
        Ok(())
    }

    /// Group-id sequence of one score's segments for one channel, in
    /// temporal (start_note) order.
    fn structural_feature(
        conn: &Connection,
        score_id: i64,
        channel: FeatureChannel,
    ) -> anyhow::Result<FeatureSequence> {
        let mut stmt = conn.prepare_cached(
            "SELECT stg.group_id
             FROM Segment s
             JOIN SegmentToGroup stg ON s.segment_id = stg.segment_id
             WHERE s.score_id = ?1 AND stg.feature_type = ?2
             ORDER BY s.start_note ASC",
        )?;

        let mut groups = Vec::new();
        let mut rows = stmt.query(params![score_id, channel.as_str()])?;
        while let Some(row) = rows.next()? {
            groups.push(Some(row.get::<_, i32>(0)?));
        }
        Ok(groups)
    }

    fn load_feature_rows(&self, table: &str) -> anyhow::Result<Vec<Entity>> {
        let conn = self.conn.lock();
        let id_column = match table {
            "Segment" => "segment_id",
            _ => "score_id",
        };
        let sql = format!(
            "SELECT {id}, diatonic_feature, chromatic_feature, rhythmic_feature,
                    diatonic_rhythmic_feature, chromatic_rhythmic_feature
             FROM {table} WHERE diatonic_feature != ''",
            id = id_column,
            table = table
        );
        let mut stmt = conn.prepare(&sql)?;

        let mut entities = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let mut features: ChannelValues<FeatureSequence> = ChannelValues::default();
            for channel in FeatureChannel::ALL {
                let text: Option<String> = row.get(1 + channel.index())?;
                *features.get_mut(channel) = parse_feature(&text.unwrap_or_default());
            }
            entities.push(Entity { id, features });
        }
        Ok(entities)
    }

    fn load_structure_entities(&self) -> anyhow::Result<Vec<Entity>> {
        let score_ids = self.load_score_ids()?;
        let conn = self.conn.lock();

        let mut entities = Vec::with_capacity(score_ids.len());
        for id in score_ids {
            let mut features: ChannelValues<FeatureSequence> = ChannelValues::default();
            for channel in FeatureChannel::ALL {
                *features.get_mut(channel) = Self::structural_feature(&conn, id, channel)?;
            }
            entities.push(Entity { id, features });
        }
        Ok(entities)
    }
}

impl Store for AlignmentDatabase {
    fn load_entities(&self, mode: EntityMode) -> anyhow::Result<Vec<Entity>> {
        match mode {
            EntityMode::SegmentFeatures => self.load_feature_rows("Segment"),
            EntityMode::ScoreFeatures => self.load_feature_rows("Score"),
            EntityMode::ScoreStructure => self.load_structure_entities(),
        }
    }

    fn load_score_ids(&self) -> anyhow::Result<Vec<i64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT score_id FROM Score")?;

        let mut ids = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn load_group_occurrences(
        &self,
        score_id: i64,
        channel: FeatureChannel,
    ) -> anyhow::Result<HashMap<i64, u32>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT stg.group_id
             FROM Segment s
             JOIN SegmentToGroup stg ON s.segment_id = stg.segment_id
             WHERE s.score_id = ?1 AND stg.feature_type = ?2",
        )?;

        let mut counts: HashMap<i64, u32> = HashMap::new();
        let mut rows = stmt.query(params![score_id, channel.as_str()])?;
        while let Some(row) = rows.next()? {
            let group_id: i64 = row.get(0)?;
            *counts.entry(group_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn load_max_group_id(&self, channel: FeatureChannel) -> anyhow::Result<i64> {
        let conn = self.conn.lock();
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(group_id) FROM SegmentToGroup WHERE feature_type = ?1",
            params![channel.as_str()],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    fn persist(&self, results: &[AlignmentResult], granularity: Granularity) -> anyhow::Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        {
            let sql = match granularity {
                Granularity::Segment => {
                    "INSERT INTO SegmentAlignment (segment_id_1, segment_id_2, diatonic_score,
                     chromatic_score, rhythmic_score, diatonic_rhythmic_score, chromatic_rhythmic_score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                }
                Granularity::Score => {
                    "INSERT INTO ScoreAlignment (score_id_1, score_id_2, level, diatonic_score,
                     chromatic_score, rhythmic_score, diatonic_rhythmic_score, chromatic_rhythmic_score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                }
            };
            let mut stmt = tx.prepare_cached(sql)?;

            for r in results {
                let s = &r.scores.0;
                match granularity {
                    Granularity::Segment => {
                        stmt.execute(params![
                            r.id_lower, r.id_higher, s[0], s[1], s[2], s[3], s[4]
                        ])?;
                    }
                    Granularity::Score => {
                        let level = r.level.map(|l| l.as_str()).unwrap_or("");
                        stmt.execute(params![
                            r.id_lower, r.id_higher, level, s[0], s[1], s[2], s[3], s[4]
                        ])?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}
