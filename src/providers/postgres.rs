//! PostgreSQL metadata provider.
//!
//! Reads the pg_catalog and information_schema views over a
//! deadpool-postgres pool the caller has already built (TLS, credentials
//! and sizing stay with the caller). All scoped queries are parameterized;
//! the optional table filter is pushed into the query as a nullable
//! parameter so single-table and whole-schema fetches share one statement.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::SimpleQueryMessage;
use tracing::debug;

use crate::error::{Result, SnapshotError};
use crate::meta::{
    ColumnRow, ForeignKeyRow, IndexRow, MetadataProvider, PrimaryKeyRow, RelationRow, SequenceRow,
    SqlRow, UniqueConstraintRow,
};
use crate::model::RelationKind;
use crate::vendor::{Engine, VendorId};

/// Metadata provider over a PostgreSQL connection pool.
pub struct PgMetadataProvider {
    pool: Pool,
    vendor: VendorId,
}

impl PgMetadataProvider {
    /// Wrap an existing pool. The vendor is classified without a server
    /// version; use [`detect_version`](Self::detect_version) to refine it.
    pub fn from_pool(pool: Pool) -> Self {
        Self {
            pool,
            vendor: VendorId::new(Engine::Postgres),
        }
    }

    /// Query the server version and record the major version on the
    /// vendor id.
    pub async fn detect_version(mut self) -> Result<Self> {
        let client = self.client("detecting server version").await?;
        let row = client
            .query_one("SELECT current_setting('server_version_num')", &[])
            .await
            .map_err(|e| SnapshotError::connectivity(e.to_string(), "detecting server version"))?;
        let version_num: String = row.get(0);
        if let Ok(num) = version_num.parse::<u32>() {
            self.vendor = VendorId::with_version(Engine::Postgres, num / 10_000);
        }
        debug!(vendor = %self.vendor, "classified server");
        Ok(self)
    }

    async fn client(&self, context: &str) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SnapshotError::connectivity(e.to_string(), context.to_string()))
    }

    async fn query_rows(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        context: &str,
    ) -> Result<Vec<tokio_postgres::Row>> {
        let client = self.client(context).await?;
        client
            .query(sql, params)
            .await
            .map_err(|e| SnapshotError::connectivity(e.to_string(), context.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for PgMetadataProvider {
    fn vendor(&self) -> VendorId {
        self.vendor
    }

    async fn relations(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<RelationRow>> {
        let sql = r#"
            SELECT
                n.nspname,
                c.relname,
                (c.relkind IN ('v', 'm')) AS is_view,
                obj_description(c.oid, 'pg_class') AS remarks,
                ts.spcname AS tablespace
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_catalog.pg_tablespace ts ON ts.oid = c.reltablespace
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'p', 'v', 'm')
              AND ($2::text IS NULL OR c.relname = $2)
            ORDER BY c.relname
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &table], "enumerating relations")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| RelationRow {
                schema: row.get(0),
                name: row.get(1),
                kind: if row.get::<_, bool>(2) {
                    RelationKind::View
                } else {
                    RelationKind::Table
                },
                remarks: row.get(3),
                tablespace: row.get(4),
            })
            .collect())
    }

    async fn columns(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ColumnRow>> {
        let sql = r#"
            SELECT
                c.table_name,
                c.column_name,
                c.udt_name,
                c.character_maximum_length::int4,
                c.numeric_precision::int4,
                c.numeric_scale::int4,
                (c.is_nullable = 'YES') AS nullable,
                c.column_default,
                col_description(pc.oid, c.ordinal_position::int4) AS remarks,
                (c.is_identity = 'YES') AS is_identity,
                CASE WHEN c.is_generated = 'ALWAYS'
                     THEN c.generation_expression END AS generation_expression,
                c.ordinal_position::int4
            FROM information_schema.columns c
            JOIN pg_catalog.pg_class pc ON pc.relname = c.table_name
            JOIN pg_catalog.pg_namespace pn
              ON pn.oid = pc.relnamespace AND pn.nspname = c.table_schema
            WHERE c.table_schema = $1
              AND ($2::text IS NULL OR c.table_name = $2)
            ORDER BY c.table_name, c.ordinal_position
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &table], "enumerating columns")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ColumnRow {
                table: row.get(0),
                name: row.get(1),
                type_code: None,
                type_name: row.get(2),
                size: row.get(3),
                precision: row.get(4),
                scale: row.get(5),
                size_unit_hint: None,
                nullable: row.get(6),
                default_value: row.get(7),
                remarks: row.get(8),
                auto_increment: Some(row.get::<_, bool>(9)),
                generation_expression: row.get(10),
                ordinal: row.get(11),
            })
            .collect())
    }

    async fn primary_keys(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<PrimaryKeyRow>> {
        let sql = r#"
            SELECT
                t.relname,
                a.attname,
                array_position(con.conkey, a.attnum)::int4 AS key_seq,
                con.conname,
                ts.spcname AS tablespace
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a
              ON a.attrelid = t.oid AND a.attnum = ANY(con.conkey)
            LEFT JOIN pg_catalog.pg_class ic ON ic.oid = con.conindid
            LEFT JOIN pg_catalog.pg_tablespace ts ON ts.oid = ic.reltablespace
            WHERE n.nspname = $1
              AND con.contype = 'p'
              AND ($2::text IS NULL OR t.relname = $2)
            ORDER BY t.relname, key_seq
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &table], "enumerating primary keys")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PrimaryKeyRow {
                table: row.get(0),
                column: row.get(1),
                key_seq: row.get(2),
                pk_name: row.get(3),
                tablespace: row.get(4),
            })
            .collect())
    }

    async fn foreign_keys(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRow>> {
        // Rule characters are mapped to the standard code scheme here so
        // the rows look the same as every other vendor's.
        let sql = r#"
            SELECT
                con.conname,
                t.relname,
                a.attname,
                rn.nspname,
                rt.relname,
                ra.attname,
                k.ord::int4 AS key_seq,
                CASE con.confupdtype
                    WHEN 'c' THEN 0 WHEN 'r' THEN 1 WHEN 'n' THEN 2
                    WHEN 'a' THEN 3 WHEN 'd' THEN 4
                END AS update_rule,
                CASE con.confdeltype
                    WHEN 'c' THEN 0 WHEN 'r' THEN 1 WHEN 'n' THEN 2
                    WHEN 'a' THEN 3 WHEN 'd' THEN 4
                END AS delete_rule,
                con.condeferrable,
                con.condeferred
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = con.confrelid
            JOIN pg_catalog.pg_namespace rn ON rn.oid = rt.relnamespace
            CROSS JOIN LATERAL
                unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, ord)
            JOIN pg_catalog.pg_attribute a
              ON a.attrelid = con.conrelid AND a.attnum = k.attnum
            JOIN pg_catalog.pg_attribute ra
              ON ra.attrelid = con.confrelid AND ra.attnum = k.fattnum
            WHERE n.nspname = $1
              AND con.contype = 'f'
              AND ($2::text IS NULL OR t.relname = $2)
            ORDER BY t.relname, con.conname, k.ord
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &table], "enumerating foreign keys")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKeyRow {
                name: row.get(0),
                table: row.get(1),
                column: row.get(2),
                referenced_schema: Some(row.get(3)),
                referenced_table: row.get(4),
                referenced_column: row.get(5),
                key_seq: row.get(6),
                update_rule: row.get(7),
                delete_rule: row.get(8),
                deferrable: row.get(9),
                initially_deferred: row.get(10),
            })
            .collect())
    }

    async fn unique_constraints(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<UniqueConstraintRow>> {
        let sql = r#"
            SELECT
                t.relname,
                con.conname,
                a.attname,
                array_position(con.conkey, a.attnum)::int4 AS position,
                con.condeferrable,
                con.condeferred,
                ic.relname AS backing_index
            FROM pg_catalog.pg_constraint con
            JOIN pg_catalog.pg_class t ON t.oid = con.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a
              ON a.attrelid = t.oid AND a.attnum = ANY(con.conkey)
            LEFT JOIN pg_catalog.pg_class ic ON ic.oid = con.conindid
            WHERE n.nspname = $1
              AND con.contype = 'u'
              AND ($2::text IS NULL OR t.relname = $2)
            ORDER BY t.relname, con.conname, position
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &table], "enumerating unique constraints")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| UniqueConstraintRow {
                table: row.get(0),
                name: row.get(1),
                column: row.get(2),
                position: row.get(3),
                deferrable: row.get(4),
                initially_deferred: row.get(5),
                disabled: false,
                backing_index: row.get(6),
            })
            .collect())
    }

    async fn indexes(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<IndexRow>> {
        let sql = r#"
            SELECT
                t.relname AS table_name,
                i.relname AS index_name,
                a.attname,
                array_position(ix.indkey::int2[], a.attnum)::int4 AS position,
                ix.indisunique,
                pg_get_expr(ix.indpred, ix.indrelid) AS predicate
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a
              ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            WHERE n.nspname = $1
              AND ($2::text IS NULL OR t.relname = $2)
            ORDER BY t.relname, i.relname, position
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &table], "enumerating indexes")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| IndexRow {
                table: row.get(0),
                index_name: row.get(1),
                column: row.get(2),
                position: row.get(3),
                unique: row.get(4),
                predicate: row.get(5),
            })
            .collect())
    }

    async fn sequences(&self, _catalog: Option<&str>, schema: &str) -> Result<Vec<SequenceRow>> {
        let sql = r#"
            SELECT
                schemaname,
                sequencename,
                start_value::text,
                min_value::text,
                max_value::text,
                increment_by::text,
                cache_size::text,
                cycle,
                data_type::text
            FROM pg_catalog.pg_sequences
            WHERE schemaname = $1
            ORDER BY sequencename
        "#;
        let rows = self
            .query_rows(sql, &[&schema], "enumerating sequences")
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SequenceRow {
                schema: row.get(0),
                name: row.get(1),
                start_value: row.get(2),
                min_value: row.get(3),
                max_value: row.get(4),
                increment_by: row.get(5),
                cache_size: row.get(6),
                cycle: row.get(7),
                ordered: None,
                data_type: row.get(8),
            })
            .collect())
    }

    async fn view_definition(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        view: &str,
    ) -> Result<String> {
        // information_schema.views hides the definition from non-owners by
        // reporting NULL.
        let sql = r#"
            SELECT view_definition
            FROM information_schema.views
            WHERE table_schema = $1 AND table_name = $2
        "#;
        let rows = self
            .query_rows(sql, &[&schema, &view], "fetching view definition")
            .await?;

        match rows.first().map(|row| row.get::<_, Option<String>>(0)) {
            Some(Some(definition)) => Ok(definition),
            _ => Err(SnapshotError::permission(
                format!("{}.{}", schema, view),
                "view definition is not visible to the current role",
            )),
        }
    }

    async fn query(&self, sql: &str) -> Result<Vec<SqlRow>> {
        let client = self.client("running secondary query").await?;
        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| SnapshotError::connectivity(e.to_string(), "running secondary query"))?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut sql_row = SqlRow::new();
                for (idx, column) in row.columns().iter().enumerate() {
                    sql_row.set(column.name(), row.get(idx).map(str::to_string));
                }
                rows.push(sql_row);
            }
        }
        Ok(rows)
    }
}

/// Shared provider handle usable by the snapshot builder.
pub fn shared(provider: PgMetadataProvider) -> Arc<dyn MetadataProvider> {
    Arc::new(provider)
}
